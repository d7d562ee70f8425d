//! 寄存器模型访问
//!
//! 限定名即布局中的变量名（分隔符为空串）。读取直接访问寄存器，写入先按
//! 声明类型转换再编码。布尔写入为 0/1。写入成功后立即读取全部变量并交付一次。

use crate::codec::{WordOrder, decode, encode};
use crate::layout::{RegisterLayout, RegisterSpec, RegisterType};
use crate::transport::RegisterTransport;
use async_trait::async_trait;
use domain::{ConnectorParameter, Value};
use mconn_connector::Notifier;
use mconn_model::{
    AccessBase, ConnectorError, ModeSignal, ModelAccess, OutputConverter, TypeMappingAccess,
};
use std::collections::BTreeMap;
use tracing::warn;

/// 布尔写入寄存器时映射为 0/1。
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterOutputConverter;

impl OutputConverter for RegisterOutputConverter {
    fn from_bool(&self, value: bool) -> Value {
        Value::Short(i16::from(value))
    }
}

/// 一次轮询读出的全部变量值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegisterSnapshot {
    pub values: BTreeMap<String, Value>,
}

impl RegisterSnapshot {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

pub struct RegisterModelAccess {
    base: AccessBase,
    layout: RegisterLayout,
    word_order: WordOrder,
    transport: RegisterTransport,
    refresh: Option<Notifier<RegisterSnapshot>>,
}

impl RegisterModelAccess {
    pub fn new(
        parameter: ConnectorParameter,
        layout: RegisterLayout,
        word_order: WordOrder,
        transport: RegisterTransport,
        mode_signal: ModeSignal,
    ) -> Self {
        Self {
            base: AccessBase::new("", parameter).with_mode_signal(mode_signal),
            layout,
            word_order,
            transport,
            refresh: None,
        }
    }

    /// 写入成功后通过该通知器交付最新快照。
    pub fn with_refresh(mut self, notifier: Notifier<RegisterSnapshot>) -> Self {
        self.refresh = Some(notifier);
        self
    }

    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    fn spec(&self, qname: &str) -> Result<(String, RegisterSpec), ConnectorError> {
        let name = self.base.resolve(qname);
        match self.layout.get(&name) {
            Some(spec) => Ok((name, *spec)),
            None => Err(ConnectorError::UnknownElement(name)),
        }
    }

    async fn read_spec(&self, spec: &RegisterSpec) -> Result<Value, ConnectorError> {
        let registers = self
            .transport
            .read(spec.offset, spec.register_count())
            .await?;
        Ok(decode(spec, &registers, self.word_order)?)
    }

    /// 按声明类型转换后写入。
    async fn put(&self, qname: &str, value: Value) -> Result<(), ConnectorError> {
        let (_, spec) = self.spec(qname)?;
        let converter = ModelAccess::input_converter(self);
        let typed = match spec.data_type {
            RegisterType::Int16 => Value::Short(converter.to_short(&value)?),
            RegisterType::Uint16 => {
                let wide = converter.to_int(&value)?;
                if u16::try_from(wide).is_err() {
                    return Err(ConnectorError::OutOfRange(format!(
                        "{} does not fit into uint16",
                        value
                    )));
                }
                Value::Int(wide)
            }
            RegisterType::Int32 => Value::Int(converter.to_int(&value)?),
            RegisterType::Uint32 => {
                let wide = converter.to_long(&value)?;
                if u32::try_from(wide).is_err() {
                    return Err(ConnectorError::OutOfRange(format!(
                        "{} does not fit into uint32",
                        value
                    )));
                }
                Value::Long(wide)
            }
            RegisterType::Int64 | RegisterType::DateTime => Value::Long(converter.to_long(&value)?),
            RegisterType::Uint64 => match value {
                Value::String(text) => Value::String(text),
                other => {
                    let wide = converter.to_long(&other)?;
                    if wide < 0 {
                        return Err(ConnectorError::OutOfRange(format!(
                            "{} does not fit into uint64",
                            other
                        )));
                    }
                    Value::Long(wide)
                }
            },
            RegisterType::Float32 => Value::Float(converter.to_float(&value)?),
            RegisterType::Float64 => Value::Double(converter.to_double(&value)?),
            RegisterType::Ascii => Value::String(converter.to_string(&value)?),
        };
        let words = encode(&spec, &typed, self.word_order)?;
        self.transport.write(spec.offset, &words).await?;
        self.refresh().await;
        Ok(())
    }

    async fn refresh(&self) {
        let Some(notifier) = &self.refresh else {
            return;
        };
        match self.snapshot().await {
            Ok(snapshot) => {
                notifier.notify(snapshot).await;
            }
            Err(err) => {
                warn!(target: "mconn.protocol", error = %err, "register_refresh_failed");
            }
        }
    }

    /// 读取布局中的全部变量。
    pub async fn snapshot(&self) -> Result<RegisterSnapshot, ConnectorError> {
        let mut values = BTreeMap::new();
        for (name, spec) in self.layout.iter() {
            values.insert(name.clone(), self.read_spec(spec).await?);
        }
        Ok(RegisterSnapshot { values })
    }
}

#[async_trait]
impl ModelAccess for RegisterModelAccess {
    fn base(&self) -> &AccessBase {
        &self.base
    }

    async fn get(&self, qname: &str) -> Result<Value, ConnectorError> {
        let (_, spec) = self.spec(qname)?;
        self.read_spec(&spec).await
    }

    async fn set(&self, qname: &str, value: Value) -> Result<(), ConnectorError> {
        self.set_mapped(qname, value).await
    }

    async fn dispose(&self) -> Result<(), ConnectorError> {
        self.transport.close().await;
        Ok(())
    }

    fn output_converter(&self) -> &dyn OutputConverter {
        &RegisterOutputConverter
    }
}

#[async_trait]
impl TypeMappingAccess for RegisterModelAccess {
    async fn put_bool(&self, qname: &str, value: bool) -> Result<(), ConnectorError> {
        let value = self.output_converter().from_bool(value);
        self.put(qname, value).await
    }

    async fn put_byte(&self, qname: &str, value: i8) -> Result<(), ConnectorError> {
        self.put(qname, Value::Byte(value)).await
    }

    async fn put_short(&self, qname: &str, value: i16) -> Result<(), ConnectorError> {
        self.put(qname, Value::Short(value)).await
    }

    async fn put_int(&self, qname: &str, value: i32) -> Result<(), ConnectorError> {
        self.put(qname, Value::Int(value)).await
    }

    async fn put_long(&self, qname: &str, value: i64) -> Result<(), ConnectorError> {
        self.put(qname, Value::Long(value)).await
    }

    async fn put_float(&self, qname: &str, value: f32) -> Result<(), ConnectorError> {
        self.put(qname, Value::Float(value)).await
    }

    async fn put_double(&self, qname: &str, value: f64) -> Result<(), ConnectorError> {
        self.put(qname, Value::Double(value)).await
    }

    async fn put_string(&self, qname: &str, value: &str) -> Result<(), ConnectorError> {
        self.put(qname, Value::String(value.to_string())).await
    }
}
