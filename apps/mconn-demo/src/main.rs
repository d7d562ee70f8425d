//! 寄存器连接器演示：按环境变量连接寄存器库或 Modbus TCP 从站，
//! 周期性记录读数，Ctrl-C 断开。

use async_trait::async_trait;
use mconn_config::{ConnectorConfig, DriverKind};
use mconn_connector::Connector;
use mconn_model::{ConnectorError, ModelAccess};
use mconn_protocol::{RegisterBank, RegisterDriver, RegisterLayout, RegisterSnapshot};
use mconn_telemetry::init_tracing;
use mconn_types::{InputTranslator, OutputTranslator, TranslatingProtocolAdapter};
use std::time::Duration;
use tracing::info;

/// 逐个变量记录读数，原样交付快照。
struct LoggingOutput;

#[async_trait]
impl OutputTranslator for LoggingOutput {
    type Protocol = RegisterSnapshot;
    type Connector = RegisterSnapshot;

    async fn initialize_model_access(&self, access: &dyn ModelAccess) -> Result<(), ConnectorError> {
        access.use_notifications(false);
        Ok(())
    }

    async fn to(
        &self,
        _access: &dyn ModelAccess,
        data: RegisterSnapshot,
    ) -> Result<RegisterSnapshot, ConnectorError> {
        for (name, value) in &data.values {
            info!(target: "mconn.demo", variable = %name, %value, "register_value");
        }
        Ok(data)
    }
}

struct NoCommand;

#[async_trait]
impl InputTranslator for NoCommand {
    type Connector = ();
    type Protocol = ();

    async fn from(&self, _access: &dyn ModelAccess, _data: ()) -> Result<(), ConnectorError> {
        Ok(())
    }
}

/// 模拟设备：首个寄存器每周期加 1。
async fn simulate(bank: RegisterBank, period: Duration) {
    let mut ticker = tokio::time::interval(period);
    loop {
        ticker.tick().await;
        if let Ok(current) = bank.read(0, 1) {
            let _ = bank.write(0, &[current[0].wrapping_add(1)]);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = ConnectorConfig::from_env()?;
    // 初始化结构化日志
    init_tracing();

    let (driver, simulated) = match config.driver {
        DriverKind::Memory => {
            let layout = RegisterLayout::from_setting(&config.server_structure)?;
            let bank = RegisterBank::for_layout(&layout);
            (RegisterDriver::in_memory(bank.clone()), Some(bank))
        }
        DriverKind::ModbusTcp => (RegisterDriver::modbus_tcp(), None),
    };

    let connector = Connector::new(
        driver,
        TranslatingProtocolAdapter::new(LoggingOutput, NoCommand),
    );
    connector.set_reception_callback::<RegisterSnapshot, _>(|snapshot: RegisterSnapshot| {
        info!(
            target: "mconn.demo",
            variables = snapshot.values.len(),
            "snapshot_received"
        );
    })?;

    let parameter = config.to_parameter();
    let period = parameter.notification_interval();
    connector.connect(parameter).await?;

    let simulation = simulated
        .filter(|bank| !bank.is_empty() && !period.is_zero())
        .map(|bank| tokio::spawn(simulate(bank, period)));

    tokio::signal::ctrl_c().await?;
    info!(target: "mconn.demo", "shutdown requested");

    if let Some(task) = simulation {
        task.abort();
    }
    connector.disconnect().await?;
    Ok(())
}
