//! 协议适配器：组合一个输出翻译器与一个输入翻译器。

use crate::translator::{InputTranslator, OutputTranslator};
use async_trait::async_trait;
use mconn_model::{ConnectorError, ModelAccess};
use std::sync::{Arc, RwLock};
use tracing::debug;

/// 双向协议适配器。
///
/// 同一时刻只绑定一个连接的模型访问；连接器在连接时绑定、断开时解绑。
#[async_trait]
pub trait ProtocolAdapter: Send + Sync + 'static {
    type ProtocolOutput: Send + 'static;
    type ProtocolInput: Send + 'static;
    type ConnectorOutput: Send + 'static;
    type ConnectorInput: Send + 'static;

    async fn adapt_input(
        &self,
        data: Self::ConnectorInput,
    ) -> Result<Self::ProtocolInput, ConnectorError>;

    async fn adapt_output(
        &self,
        data: Self::ProtocolOutput,
    ) -> Result<Self::ConnectorOutput, ConnectorError>;

    fn bind_model_access(&self, access: Arc<dyn ModelAccess>);

    fn unbind_model_access(&self);

    fn model_access(&self) -> Option<Arc<dyn ModelAccess>>;

    /// 调用输出翻译器的初始化（设置通知模式、注册监控）。
    async fn initialize_model_access(&self) -> Result<(), ConnectorError>;
}

/// 基于翻译器对的适配器。
pub struct TranslatingProtocolAdapter<OT, IT> {
    output: OT,
    input: IT,
    access: RwLock<Option<Arc<dyn ModelAccess>>>,
}

impl<OT, IT> TranslatingProtocolAdapter<OT, IT>
where
    OT: OutputTranslator,
    IT: InputTranslator,
{
    pub fn new(output: OT, input: IT) -> Self {
        Self {
            output,
            input,
            access: RwLock::new(None),
        }
    }

    pub fn output_translator(&self) -> &OT {
        &self.output
    }

    pub fn input_translator(&self) -> &IT {
        &self.input
    }

    fn bound(&self) -> Result<Arc<dyn ModelAccess>, ConnectorError> {
        self.access
            .read()
            .map_err(|_| ConnectorError::IllegalState("model access lock poisoned".to_string()))?
            .clone()
            .ok_or(ConnectorError::NotConnected)
    }
}

#[async_trait]
impl<OT, IT> ProtocolAdapter for TranslatingProtocolAdapter<OT, IT>
where
    OT: OutputTranslator,
    IT: InputTranslator,
{
    type ProtocolOutput = OT::Protocol;
    type ProtocolInput = IT::Protocol;
    type ConnectorOutput = OT::Connector;
    type ConnectorInput = IT::Connector;

    async fn adapt_input(
        &self,
        data: Self::ConnectorInput,
    ) -> Result<Self::ProtocolInput, ConnectorError> {
        let access = self.bound()?;
        self.input.from(access.as_ref(), data).await
    }

    async fn adapt_output(
        &self,
        data: Self::ProtocolOutput,
    ) -> Result<Self::ConnectorOutput, ConnectorError> {
        let access = self.bound()?;
        self.output.to(access.as_ref(), data).await
    }

    fn bind_model_access(&self, access: Arc<dyn ModelAccess>) {
        match self.access.write() {
            Ok(mut slot) => *slot = Some(access),
            Err(poisoned) => *poisoned.into_inner() = Some(access),
        }
    }

    fn unbind_model_access(&self) {
        match self.access.write() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn model_access(&self) -> Option<Arc<dyn ModelAccess>> {
        self.access.read().ok().and_then(|slot| slot.clone())
    }

    async fn initialize_model_access(&self) -> Result<(), ConnectorError> {
        let access = self.bound()?;
        self.output.initialize_model_access(access.as_ref()).await?;
        debug!(
            target: "mconn.connector",
            mode = ?access.base().notification_mode(),
            "model_access_initialized"
        );
        Ok(())
    }
}
