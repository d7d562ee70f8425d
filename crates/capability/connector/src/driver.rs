//! 协议驱动接口。

use async_trait::async_trait;
use domain::ConnectorParameter;
use mconn_model::{ConnectorError, ModeSignal, ModelAccess};
use std::sync::Arc;

/// 协议输出的接收端（连接器内部的分发器）。
#[async_trait]
pub trait OutputSink<O>: Send + Sync {
    /// 交付一条协议输出；返回是否到达了接收回调。
    async fn deliver(&self, data: O) -> bool;
}

/// 推送通道：协议驱动在事件回调中通过它交付数据。
///
/// 连接断开后，旧连接的通知器不再产生任何回调调用。
pub struct Notifier<O> {
    sink: Arc<dyn OutputSink<O>>,
}

impl<O> Clone for Notifier<O> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
        }
    }
}

impl<O: Send + 'static> Notifier<O> {
    pub fn new(sink: Arc<dyn OutputSink<O>>) -> Self {
        Self { sink }
    }

    pub async fn notify(&self, data: O) -> bool {
        self.sink.deliver(data).await
    }
}

/// 连接时交给驱动的上下文。
pub struct ModelContext<O> {
    /// 交给模型访问（`AccessBase::with_mode_signal`），通知模式切换。
    pub mode_signal: ModeSignal,
    pub notifier: Notifier<O>,
}

/// 协议驱动。
///
/// 驱动负责会话的建立与释放、按需读取一次协议输出（轮询）、写入协议输入。
/// 模型访问由驱动在 `connect_impl` 中创建，每次连接都是新的实例。
#[async_trait]
pub trait ConnectorDriver: Send + Sync + 'static {
    type Output: Send + 'static;
    type Input: Send + 'static;

    fn name(&self) -> &str;

    /// 建立会话并创建模型访问；会话无法建立时返回 `ConnectionFailed`。
    async fn connect_impl(
        &self,
        parameter: &ConnectorParameter,
        context: ModelContext<Self::Output>,
    ) -> Result<Arc<dyn ModelAccess>, ConnectorError>;

    /// 读取一次协议输出；`None` 表示当前没有可交付的数据。
    async fn read(&self) -> Result<Option<Self::Output>, ConnectorError>;

    async fn write_impl(&self, data: Self::Input) -> Result<(), ConnectorError>;

    async fn disconnect_impl(&self) -> Result<(), ConnectorError>;
}
