use async_trait::async_trait;
use domain::{ConnectorParameter, Value};
use mconn_connector::{
    Connector, ConnectorDriver, ConnectorState, ModelContext, Notifier, ReceptionCallback,
};
use mconn_model::{AccessBase, ConnectorError, ModelAccess};
use mconn_types::{
    AdapterSelector, AdapterSet, InputTranslator, OutputTranslator, ProtocolAdapter,
    TranslatingProtocolAdapter,
};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct TestAccess {
    base: AccessBase,
    disposed: Arc<AtomicU32>,
}

#[async_trait]
impl ModelAccess for TestAccess {
    fn base(&self) -> &AccessBase {
        &self.base
    }

    async fn get(&self, _qname: &str) -> Result<Value, ConnectorError> {
        Ok(Value::Null)
    }

    async fn set(&self, _qname: &str, _value: Value) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn dispose(&self) -> Result<(), ConnectorError> {
        self.disposed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct TestDriver {
    fail_connect: bool,
    write_delay: Duration,
    counter: AtomicU32,
    connects: AtomicU32,
    disconnects: AtomicU32,
    disposed: Arc<AtomicU32>,
    notifiers: Mutex<Vec<Notifier<u32>>>,
    writes: Mutex<Vec<i32>>,
}

impl TestDriver {
    fn notifier(&self) -> Notifier<u32> {
        self.notifiers
            .lock()
            .expect("notifiers")
            .last()
            .cloned()
            .expect("connected at least once")
    }
}

#[async_trait]
impl ConnectorDriver for TestDriver {
    type Output = u32;
    type Input = i32;

    fn name(&self) -> &str {
        "test"
    }

    async fn connect_impl(
        &self,
        parameter: &ConnectorParameter,
        context: ModelContext<u32>,
    ) -> Result<Arc<dyn ModelAccess>, ConnectorError> {
        if self.fail_connect {
            return Err(ConnectorError::ConnectionFailed("refused".to_string()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.notifiers
            .lock()
            .expect("notifiers")
            .push(context.notifier);
        Ok(Arc::new(TestAccess {
            base: AccessBase::new(".", parameter.clone()).with_mode_signal(context.mode_signal),
            disposed: Arc::clone(&self.disposed),
        }))
    }

    async fn read(&self) -> Result<Option<u32>, ConnectorError> {
        Ok(Some(self.counter.fetch_add(1, Ordering::SeqCst)))
    }

    async fn write_impl(&self, data: i32) -> Result<(), ConnectorError> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        self.writes.lock().expect("writes").push(data);
        Ok(())
    }

    async fn disconnect_impl(&self) -> Result<(), ConnectorError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct PassOutput {
    notifications: bool,
    offset: u32,
    initialized: Arc<AtomicU32>,
}

impl PassOutput {
    fn new(notifications: bool) -> Self {
        Self {
            notifications,
            offset: 0,
            initialized: Arc::default(),
        }
    }
}

#[async_trait]
impl OutputTranslator for PassOutput {
    type Protocol = u32;
    type Connector = u32;

    async fn initialize_model_access(&self, access: &dyn ModelAccess) -> Result<(), ConnectorError> {
        access.use_notifications(self.notifications);
        self.initialized.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn to(&self, _access: &dyn ModelAccess, data: u32) -> Result<u32, ConnectorError> {
        Ok(data + self.offset)
    }
}

#[derive(Default)]
struct PassInput {
    offset: i32,
}

#[async_trait]
impl InputTranslator for PassInput {
    type Connector = i32;
    type Protocol = i32;

    async fn from(&self, _access: &dyn ModelAccess, data: i32) -> Result<i32, ConnectorError> {
        Ok(data + self.offset)
    }
}

type TestAdapter = TranslatingProtocolAdapter<PassOutput, PassInput>;
type TestConnector = Connector<TestDriver, TestAdapter>;

fn connector(driver: TestDriver, notifications: bool) -> TestConnector {
    Connector::new(
        driver,
        TranslatingProtocolAdapter::new(PassOutput::new(notifications), PassInput::default()),
    )
}

fn parameter() -> ConnectorParameter {
    ConnectorParameter::builder("localhost", 0)
        .notification_interval_ms(20)
        .build()
}

fn collect(connector: &TestConnector) -> Arc<Mutex<Vec<u32>>> {
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    connector
        .set_reception_callback::<u32, _>(move |value: u32| {
            sink.lock().expect("received").push(value);
        })
        .expect("set callback");
    received
}

fn count(received: &Arc<Mutex<Vec<u32>>>) -> usize {
    received.lock().expect("received").len()
}

async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

#[tokio::test]
async fn polling_delivers_until_disconnect() {
    let connector = connector(TestDriver::default(), false);
    let received = collect(&connector);

    connector.connect(parameter()).await.expect("connect");
    assert_eq!(connector.state().await, ConnectorState::Connected);
    assert!(connector.is_polling().await);
    assert!(connector.connection_id().await.is_some());
    assert!(eventually(|| count(&received) >= 3).await);

    connector.disconnect().await.expect("disconnect");
    let after = count(&received);
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(count(&received), after);
    assert_eq!(connector.state().await, ConnectorState::Disconnected);
    assert!(!connector.is_polling().await);
    assert!(connector.model_access().is_none());
}

#[tokio::test]
async fn notifications_mode_delivers_pushed_data() {
    let connector = connector(TestDriver::default(), true);
    let received = collect(&connector);

    connector.connect(parameter()).await.expect("connect");
    assert!(!connector.is_polling().await);

    assert!(connector.driver().notifier().notify(41).await);
    assert_eq!(*received.lock().expect("received"), vec![41]);
    connector.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn stale_notifier_is_inert_after_disconnect() {
    let connector = connector(TestDriver::default(), true);
    let received = collect(&connector);

    connector.connect(parameter()).await.expect("connect");
    let stale = connector.driver().notifier();
    connector.disconnect().await.expect("disconnect");

    assert!(!stale.notify(7).await);
    assert!(received.lock().expect("received").is_empty());

    connector.connect(parameter()).await.expect("reconnect");
    assert!(!stale.notify(8).await);
    assert!(connector.driver().notifier().notify(9).await);
    assert_eq!(*received.lock().expect("received"), vec![9]);
    connector.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn reconnect_creates_fresh_model_access() {
    let connector = connector(TestDriver::default(), true);

    connector.connect(parameter()).await.expect("connect");
    let first = connector.model_access().expect("first access");
    let first_id = connector.connection_id().await.expect("first id");
    connector.disconnect().await.expect("disconnect");
    assert_eq!(connector.driver().disposed.load(Ordering::SeqCst), 1);
    assert_eq!(connector.driver().disconnects.load(Ordering::SeqCst), 1);

    connector.connect(parameter()).await.expect("reconnect");
    let second = connector.model_access().expect("second access");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_ne!(connector.connection_id().await.expect("second id"), first_id);
    assert_eq!(connector.driver().connects.load(Ordering::SeqCst), 2);
    connector.disconnect().await.expect("disconnect");
    connector.disconnect().await.expect("disconnect twice");
    assert_eq!(connector.driver().disposed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn mismatched_sink_type_is_skipped() {
    let connector = connector(TestDriver::default(), true);
    let hits = Arc::new(AtomicU32::new(0));
    let sink = Arc::clone(&hits);
    connector
        .set_reception_callback::<String, _>(move |_value: String| {
            sink.fetch_add(1, Ordering::SeqCst);
        })
        .expect("set callback");

    connector.connect(parameter()).await.expect("connect");
    assert!(!connector.poll_once().await.expect("poll once"));
    assert!(!connector.driver().notifier().notify(1).await);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    connector.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn poll_once_dispatches_on_demand() {
    let connector = connector(TestDriver::default(), true);
    let received = collect(&connector);

    assert!(matches!(
        connector.poll_once().await,
        Err(ConnectorError::NotConnected)
    ));
    connector.connect(parameter()).await.expect("connect");
    assert!(connector.poll_once().await.expect("poll once"));
    assert_eq!(*received.lock().expect("received"), vec![0]);
    connector.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn lifecycle_rejects_illegal_transitions() {
    let connector = connector(TestDriver::default(), true);
    connector.connect(parameter()).await.expect("connect");

    assert!(matches!(
        connector.connect(parameter()).await,
        Err(ConnectorError::IllegalState(_))
    ));
    assert!(matches!(
        connector.set_reception_callback::<u32, _>(|_value: u32| {}),
        Err(ConnectorError::IllegalState(_))
    ));
    connector.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn failed_session_reports_connection_failed() {
    let driver = TestDriver {
        fail_connect: true,
        ..TestDriver::default()
    };
    let connector = connector(driver, false);

    assert!(matches!(
        connector.connect(parameter()).await,
        Err(ConnectorError::ConnectionFailed(_))
    ));
    assert_eq!(connector.state().await, ConnectorState::Disconnected);
    assert!(connector.model_access().is_none());
    connector
        .set_reception_callback::<u32, _>(|_value: u32| {})
        .expect("callback after failed connect");
}

#[tokio::test]
async fn write_is_bounded_by_request_timeout() {
    let driver = TestDriver {
        write_delay: Duration::from_millis(300),
        ..TestDriver::default()
    };
    let connector = connector(driver, true);

    assert!(matches!(
        connector.write(1).await,
        Err(ConnectorError::NotConnected)
    ));
    let parameter = ConnectorParameter::builder("localhost", 0)
        .request_timeout_ms(50)
        .build();
    connector.connect(parameter).await.expect("connect");

    assert!(matches!(
        connector.write(1).await,
        Err(ConnectorError::Timeout(_))
    ));
    connector.disconnect().await.expect("disconnect");
}

#[tokio::test]
async fn write_passes_through_adapter() {
    let connector = connector(TestDriver::default(), true);
    connector.connect(parameter()).await.expect("connect");

    connector.write(5).await.expect("write");
    connector.write(-2).await.expect("write");
    assert_eq!(*connector.driver().writes.lock().expect("writes"), vec![5, -2]);
    connector.disconnect().await.expect("disconnect");
}

struct SlowSink {
    started: Arc<AtomicBool>,
    finished: Arc<AtomicBool>,
}

#[async_trait]
impl ReceptionCallback<u32> for SlowSink {
    async fn received(&self, _data: u32) {
        self.started.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        self.finished.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn disconnect_waits_for_in_flight_delivery() {
    let connector = connector(TestDriver::default(), true);
    let started = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    connector
        .set_reception_callback::<u32, _>(SlowSink {
            started: Arc::clone(&started),
            finished: Arc::clone(&finished),
        })
        .expect("set callback");

    connector.connect(parameter()).await.expect("connect");
    let notifier = connector.driver().notifier();
    let delivery = tokio::spawn(async move { notifier.notify(1).await });
    assert!(eventually(|| started.load(Ordering::SeqCst)).await);

    connector.disconnect().await.expect("disconnect");
    assert!(finished.load(Ordering::SeqCst));
    assert!(delivery.await.expect("delivery task"));
}

#[tokio::test]
async fn switching_to_polling_after_connect_installs_poller() {
    let connector = connector(TestDriver::default(), true);
    let received = collect(&connector);
    connector.connect(parameter()).await.expect("connect");
    assert!(!connector.is_polling().await);

    connector
        .model_access()
        .expect("access")
        .use_notifications(false);

    let mut polling = false;
    for _ in 0..200 {
        if connector.is_polling().await {
            polling = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(polling);
    assert!(eventually(|| count(&received) >= 1).await);

    connector
        .model_access()
        .expect("access")
        .use_notifications(true);
    let mut stopped = false;
    for _ in 0..200 {
        if !connector.is_polling().await {
            stopped = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(stopped);
    connector.disconnect().await.expect("disconnect");
}

/// 奇数输出与负数命令交给第二个适配器。
struct BySign;

impl AdapterSelector<TestAdapter> for BySign {
    fn select_output<'a>(&self, data: &u32, adapters: &'a AdapterSet<TestAdapter>) -> &'a Arc<TestAdapter> {
        if data % 2 == 1 {
            adapters.get(1).unwrap_or_else(|| adapters.first())
        } else {
            adapters.first()
        }
    }

    fn select_input<'a>(&self, data: &i32, adapters: &'a AdapterSet<TestAdapter>) -> &'a Arc<TestAdapter> {
        if *data < 0 {
            adapters.get(1).unwrap_or_else(|| adapters.first())
        } else {
            adapters.first()
        }
    }
}

#[tokio::test]
async fn every_adapter_is_initialized_and_selected_per_item() {
    let initialized = Arc::new(AtomicU32::new(0));
    let adapter = |offset: u32| {
        TranslatingProtocolAdapter::new(
            PassOutput {
                notifications: true,
                offset,
                initialized: Arc::clone(&initialized),
            },
            PassInput {
                offset: offset as i32,
            },
        )
    };
    let connector = Connector::with_adapters(
        TestDriver::default(),
        AdapterSet::new(adapter(0)).with_adapter(adapter(1000)),
        BySign,
    );
    let received = collect(&connector);
    connector.connect(parameter()).await.expect("connect");
    assert_eq!(initialized.load(Ordering::SeqCst), 2);
    assert!(connector.adapters().iter().all(|adapter| adapter.model_access().is_some()));

    let notifier = connector.driver().notifier();
    assert!(notifier.notify(2).await);
    assert!(notifier.notify(3).await);
    assert_eq!(*received.lock().expect("received"), vec![2, 1003]);

    connector.write(4).await.expect("write");
    connector.write(-3).await.expect("write");
    assert_eq!(*connector.driver().writes.lock().expect("writes"), vec![4, 997]);

    connector.disconnect().await.expect("disconnect");
    assert!(connector.adapters().iter().all(|adapter| adapter.model_access().is_none()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reception_callback_is_settable_while_state_is_queried() {
    let connector = Arc::new(connector(TestDriver::default(), true));
    let querying = {
        let connector = Arc::clone(&connector);
        tokio::spawn(async move {
            for _ in 0..2000 {
                assert_eq!(connector.state().await, ConnectorState::Disconnected);
                assert!(!connector.is_polling().await);
            }
        })
    };
    for _ in 0..200 {
        connector
            .set_reception_callback::<u32, _>(|_value: u32| {})
            .expect("set callback while disconnected");
        tokio::task::yield_now().await;
    }
    querying.await.expect("query task");

    connector.connect(parameter()).await.expect("connect");
    assert!(matches!(
        connector.set_reception_callback::<u32, _>(|_value: u32| {}),
        Err(ConnectorError::IllegalState(_))
    ));
    connector.disconnect().await.expect("disconnect");
    connector
        .set_reception_callback::<u32, _>(|_value: u32| {})
        .expect("set callback after disconnect");
}
