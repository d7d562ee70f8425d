//! 连接器错误类型定义

/// 模型访问与连接器操作的统一错误。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectorError {
    /// 当前协议不支持该操作（结构体、调用、多值、监控等）
    #[error("not supported: {0}")]
    NotSupported(String),

    /// 值无法转换为请求的类型
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// 会话建立失败
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// 超出协议就绪窗口
    #[error("timeout: {0}")]
    Timeout(String),

    /// 数值超出目标类型范围
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// 限定名不存在
    #[error("unknown element: {0}")]
    UnknownElement(String),

    /// 未连接或访问层已解绑
    #[error("not connected")]
    NotConnected,

    /// 生命周期状态不允许该操作
    #[error("illegal state: {0}")]
    IllegalState(String),

    /// 协议层错误
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ConnectorError {
    pub fn not_supported(operation: &str) -> Self {
        Self::NotSupported(operation.to_string())
    }

    /// `optional` 可吞掉的失败：不支持或超出范围。
    pub fn is_optional_failure(&self) -> bool {
        matches!(self, Self::NotSupported(_) | Self::OutOfRange(_))
    }
}
