//! 追踪初始化与连接 ID 生成。

use tracing_subscriber::{EnvFilter, fmt};

/// 初始化 tracing（默认 info，`RUST_LOG` 覆盖）；重复调用无副作用。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成新的 connection_id，标记一次连接的所有事件。
pub fn new_connection_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 连接级 span，驱动内部事件挂在其下。
pub fn connection_span(connector: &str, connection_id: &str) -> tracing::Span {
    tracing::info_span!(
        target: "mconn.connector",
        "connection",
        connector = %connector,
        connection_id = %connection_id
    )
}
