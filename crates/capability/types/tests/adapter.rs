use async_trait::async_trait;
use domain::{ConnectorParameter, Value};
use mconn_model::{AccessBase, ConnectorError, ModelAccess};
use mconn_types::{
    Field, InputTranslator, OutputTranslator, ProtocolAdapter, TranslatingProtocolAdapter,
    write_changed,
};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

struct MapAccess {
    base: AccessBase,
    values: Mutex<BTreeMap<String, Value>>,
    writes: Mutex<Vec<String>>,
}

impl MapAccess {
    fn new() -> Arc<Self> {
        let mut values = BTreeMap::new();
        values.insert("speed".to_string(), Value::Int(10));
        values.insert("label".to_string(), Value::from("idle"));
        Arc::new(Self {
            base: AccessBase::new("/", ConnectorParameter::builder("localhost", 0).build()),
            values: Mutex::new(values),
            writes: Mutex::new(Vec::new()),
        })
    }

    fn writes(&self) -> Vec<String> {
        self.writes.lock().expect("writes").clone()
    }
}

#[async_trait]
impl ModelAccess for MapAccess {
    fn base(&self) -> &AccessBase {
        &self.base
    }

    async fn get(&self, qname: &str) -> Result<Value, ConnectorError> {
        self.values
            .lock()
            .expect("values")
            .get(qname)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownElement(qname.to_string()))
    }

    async fn set(&self, qname: &str, value: Value) -> Result<(), ConnectorError> {
        self.writes.lock().expect("writes").push(qname.to_string());
        self.values
            .lock()
            .expect("values")
            .insert(qname.to_string(), value);
        Ok(())
    }
}

#[derive(Debug, PartialEq)]
struct Status {
    speed: i32,
    label: String,
}

#[derive(Default)]
struct Command {
    speed: Field<i32>,
    label: Field<String>,
}

struct StatusTranslator;

#[async_trait]
impl OutputTranslator for StatusTranslator {
    type Protocol = ();
    type Connector = Status;

    async fn initialize_model_access(&self, access: &dyn ModelAccess) -> Result<(), ConnectorError> {
        access.use_notifications(false);
        Ok(())
    }

    async fn to(&self, access: &dyn ModelAccess, _data: ()) -> Result<Status, ConnectorError> {
        Ok(Status {
            speed: access.get_int("speed").await?,
            label: access.get_string("label").await?,
        })
    }
}

struct CommandTranslator;

#[async_trait]
impl InputTranslator for CommandTranslator {
    type Connector = Command;
    type Protocol = ();

    async fn from(&self, access: &dyn ModelAccess, data: Command) -> Result<(), ConnectorError> {
        write_changed(access, "speed", &data.speed).await?;
        write_changed(access, "label", &data.label).await?;
        Ok(())
    }
}

fn adapter() -> TranslatingProtocolAdapter<StatusTranslator, CommandTranslator> {
    TranslatingProtocolAdapter::new(StatusTranslator, CommandTranslator)
}

#[tokio::test]
async fn unbound_adapter_is_not_connected() {
    let adapter = adapter();
    assert!(matches!(
        adapter.adapt_output(()).await,
        Err(ConnectorError::NotConnected)
    ));
    assert!(matches!(
        adapter.adapt_input(Command::default()).await,
        Err(ConnectorError::NotConnected)
    ));
    assert!(adapter.model_access().is_none());
}

#[tokio::test]
async fn input_writes_only_changed_fields() {
    let adapter = adapter();
    let access = MapAccess::new();
    adapter.bind_model_access(access.clone());

    let mut command = Command::default();
    command.speed.set(42);
    adapter.adapt_input(command).await.expect("adapt input");

    assert_eq!(access.writes(), vec!["speed".to_string()]);
    let status = adapter.adapt_output(()).await.expect("adapt output");
    assert_eq!(
        status,
        Status {
            speed: 42,
            label: "idle".to_string()
        }
    );
}

#[tokio::test]
async fn unchanged_command_writes_nothing() {
    let adapter = adapter();
    let access = MapAccess::new();
    adapter.bind_model_access(access.clone());

    let command = Command {
        speed: Field::new(99),
        label: Field::new("ignored".to_string()),
    };
    adapter.adapt_input(command).await.expect("adapt input");
    assert!(access.writes().is_empty());
}

#[tokio::test]
async fn initialize_runs_output_translator_then_unbind_detaches() {
    let adapter = adapter();
    let access = MapAccess::new();
    adapter.bind_model_access(access.clone());

    adapter
        .initialize_model_access()
        .await
        .expect("initialize");
    assert!(access.base().notification_mode().is_some());

    adapter.unbind_model_access();
    assert!(matches!(
        adapter.adapt_output(()).await,
        Err(ConnectorError::NotConnected)
    ));
}

#[test]
fn field_tracks_change_mark() {
    let mut field = Field::new(1);
    assert!(field.changed_value().is_none());
    field.set(2);
    assert_eq!(field.changed_value(), Some(&2));
    field.clear_changed();
    assert!(!field.is_changed());
    assert_eq!(*field.get(), 2);
}
