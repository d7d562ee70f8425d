//! 寄存器协议驱动
//!
//! 轮询时读出布局中的全部变量，交付一份 [`RegisterSnapshot`]。
//! 写入经由模型访问完成，协议输入为空。

use crate::access::{RegisterModelAccess, RegisterSnapshot};
use crate::bank::RegisterBank;
use crate::settings::RegisterSettings;
use crate::transport::{ModbusLink, RegisterTransport};
use async_trait::async_trait;
use domain::ConnectorParameter;
use mconn_connector::{ConnectorDriver, ModelContext};
use mconn_model::{ConnectorError, ModelAccess};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

enum RegisterSource {
    InMemory(RegisterBank),
    ModbusTcp,
}

pub struct RegisterDriver {
    source: RegisterSource,
    access: Mutex<Option<Arc<RegisterModelAccess>>>,
}

impl RegisterDriver {
    /// 使用进程内寄存器库
    pub fn in_memory(bank: RegisterBank) -> Self {
        Self {
            source: RegisterSource::InMemory(bank),
            access: Mutex::new(None),
        }
    }

    /// 连接参数中的主机与端口指向 Modbus TCP 从站
    pub fn modbus_tcp() -> Self {
        Self {
            source: RegisterSource::ModbusTcp,
            access: Mutex::new(None),
        }
    }

    fn current(&self) -> Option<Arc<RegisterModelAccess>> {
        match self.access.lock() {
            Ok(access) => access.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn replace(&self, access: Option<Arc<RegisterModelAccess>>) {
        match self.access.lock() {
            Ok(mut slot) => *slot = access,
            Err(poisoned) => *poisoned.into_inner() = access,
        }
    }
}

#[async_trait]
impl ConnectorDriver for RegisterDriver {
    type Output = RegisterSnapshot;
    type Input = ();

    fn name(&self) -> &str {
        match self.source {
            RegisterSource::InMemory(_) => "register-bank",
            RegisterSource::ModbusTcp => "modbus-tcp",
        }
    }

    async fn connect_impl(
        &self,
        parameter: &ConnectorParameter,
        context: ModelContext<RegisterSnapshot>,
    ) -> Result<Arc<dyn ModelAccess>, ConnectorError> {
        let settings = RegisterSettings::from_parameter(parameter)
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;

        let transport = match &self.source {
            RegisterSource::InMemory(bank) => {
                let required = settings.layout.required_registers();
                if bank.len() < required {
                    return Err(ConnectorError::ConnectionFailed(format!(
                        "register bank holds {} registers, layout needs {}",
                        bank.len(),
                        required
                    )));
                }
                RegisterTransport::InMemory(bank.clone())
            }
            RegisterSource::ModbusTcp => RegisterTransport::ModbusTcp(
                ModbusLink::connect(
                    parameter.host(),
                    parameter.port(),
                    settings.unit_id,
                    settings.timeout,
                )
                .await?,
            ),
        };

        info!(
            target: "mconn.protocol",
            driver = self.name(),
            variables = settings.layout.len(),
            "register_session_opened"
        );

        let access = Arc::new(RegisterModelAccess::new(
            parameter.clone(),
            settings.layout,
            settings.word_order,
            transport,
            context.mode_signal,
        )
        .with_refresh(context.notifier));
        self.replace(Some(Arc::clone(&access)));
        Ok(access)
    }

    async fn read(&self) -> Result<Option<RegisterSnapshot>, ConnectorError> {
        let Some(access) = self.current() else {
            return Err(ConnectorError::NotConnected);
        };
        let snapshot = access.snapshot().await?;
        debug!(target: "mconn.protocol", variables = snapshot.values.len(), "register_snapshot");
        Ok(Some(snapshot))
    }

    async fn write_impl(&self, _data: ()) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn disconnect_impl(&self) -> Result<(), ConnectorError> {
        self.replace(None);
        info!(target: "mconn.protocol", driver = self.name(), "register_session_closed");
        Ok(())
    }
}
