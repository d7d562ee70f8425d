//! 接收分发与轮询任务。

use crate::driver::{ConnectorDriver, OutputSink};
use crate::reception::Reception;
use async_trait::async_trait;
use domain::NotificationMode;
use mconn_types::{AdapterSelector, AdapterSet, ProtocolAdapter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, Span, debug, info, warn};

/// 单个连接的分发器：协议输出 → 选定的适配器 → 接收回调。
///
/// 闸门读锁覆盖整个交付过程，`close` 取写锁，因此 `close` 返回后
/// 不会再有回调开始或仍在执行。
pub(crate) struct Dispatcher<A: ProtocolAdapter> {
    adapters: Arc<AdapterSet<A>>,
    selector: Arc<dyn AdapterSelector<A>>,
    reception: Option<Arc<dyn Reception>>,
    gate: RwLock<bool>,
    connector: String,
    connection_id: String,
}

impl<A: ProtocolAdapter> Dispatcher<A> {
    pub(crate) fn new(
        adapters: Arc<AdapterSet<A>>,
        selector: Arc<dyn AdapterSelector<A>>,
        reception: Option<Arc<dyn Reception>>,
        connector: String,
        connection_id: String,
    ) -> Self {
        Self {
            adapters,
            selector,
            reception,
            gate: RwLock::new(true),
            connector,
            connection_id,
        }
    }

    pub(crate) async fn dispatch(&self, data: A::ProtocolOutput) -> bool {
        let open = self.gate.read().await;
        if !*open {
            debug!(
                target: "mconn.connector",
                connector = %self.connector,
                connection_id = %self.connection_id,
                "reception_dropped"
            );
            return false;
        }
        let adapter = self.selector.select_output(&data, &self.adapters);
        let output = match adapter.adapt_output(data).await {
            Ok(output) => output,
            Err(err) => {
                warn!(
                    target: "mconn.connector",
                    connector = %self.connector,
                    connection_id = %self.connection_id,
                    error = %err,
                    "adapt_output_failed"
                );
                return false;
            }
        };
        let Some(reception) = &self.reception else {
            return false;
        };
        let delivered = reception.dispatch(Box::new(output)).await;
        if !delivered {
            debug!(
                target: "mconn.connector",
                connector = %self.connector,
                declared_type = reception.declared_type(),
                "reception_type_mismatch"
            );
        }
        delivered
    }

    /// 关闭闸门并等待进行中的交付结束。
    pub(crate) async fn close(&self) {
        let mut open = self.gate.write().await;
        *open = false;
    }
}

#[async_trait]
impl<A: ProtocolAdapter> OutputSink<A::ProtocolOutput> for Dispatcher<A> {
    async fn deliver(&self, data: A::ProtocolOutput) -> bool {
        self.dispatch(data).await
    }
}

/// 轮询任务的安装与卸载。
pub(crate) struct PollControl<D, A>
where
    D: ConnectorDriver,
    A: ProtocolAdapter<ProtocolOutput = D::Output>,
{
    driver: Arc<D>,
    dispatcher: Arc<Dispatcher<A>>,
    period: Duration,
    span: Span,
    task: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<D, A> PollControl<D, A>
where
    D: ConnectorDriver,
    A: ProtocolAdapter<ProtocolOutput = D::Output>,
{
    pub(crate) fn new(
        driver: Arc<D>,
        dispatcher: Arc<Dispatcher<A>>,
        period: Duration,
        span: Span,
    ) -> Self {
        Self {
            driver,
            dispatcher,
            period,
            span,
            task: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn apply(&self, mode: NotificationMode) {
        match mode {
            NotificationMode::Polling => self.start(),
            NotificationMode::Notifications => self.stop(),
        }
    }

    /// 周期为 0 或已关闭时不安装轮询任务。
    fn start(&self) {
        if self.period.is_zero() {
            return;
        }
        let Ok(mut task) = self.task.lock() else {
            return;
        };
        // 与 close 在同一把锁下判断，关闭之后不会再启动
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let driver = Arc::clone(&self.driver);
        let dispatcher = Arc::clone(&self.dispatcher);
        let period = self.period;
        info!(
            target: "mconn.connector",
            parent: &self.span,
            period_ms = period.as_millis() as u64,
            "polling_started"
        );
        let poll = async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match driver.read().await {
                    Ok(Some(data)) => {
                        dispatcher.dispatch(data).await;
                    }
                    Ok(None) => {}
                    Err(err) => {
                        warn!(
                            target: "mconn.connector",
                            error = %err,
                            "while polling, data discarded"
                        );
                    }
                }
            }
        };
        *task = Some(tokio::spawn(poll.instrument(self.span.clone())));
    }

    pub(crate) fn stop(&self) {
        let handle = match self.task.lock() {
            Ok(mut task) => task.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(handle) = handle {
            handle.abort();
            info!(target: "mconn.connector", parent: &self.span, "polling_stopped");
        }
    }

    /// 停止轮询并拒绝之后的所有启动请求。
    pub(crate) fn close(&self) {
        {
            let _task = match self.task.lock() {
                Ok(task) => task,
                Err(poisoned) => poisoned.into_inner(),
            };
            self.closed.store(true, Ordering::SeqCst);
        }
        self.stop();
    }

    pub(crate) fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|task| task.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ModelContext;
    use domain::ConnectorParameter;
    use mconn_model::{ConnectorError, ModelAccess};
    use mconn_types::{FirstAdapterSelector, InputTranslator, OutputTranslator, TranslatingProtocolAdapter};
    use std::sync::atomic::AtomicU32;

    #[derive(Default)]
    struct Ticks(AtomicU32);

    #[async_trait]
    impl ConnectorDriver for Ticks {
        type Output = u32;
        type Input = ();

        fn name(&self) -> &str {
            "ticks"
        }

        async fn connect_impl(
            &self,
            _parameter: &ConnectorParameter,
            _context: ModelContext<u32>,
        ) -> Result<Arc<dyn ModelAccess>, ConnectorError> {
            Err(ConnectorError::not_supported("connect"))
        }

        async fn read(&self) -> Result<Option<u32>, ConnectorError> {
            Ok(Some(self.0.fetch_add(1, Ordering::SeqCst)))
        }

        async fn write_impl(&self, _data: ()) -> Result<(), ConnectorError> {
            Ok(())
        }

        async fn disconnect_impl(&self) -> Result<(), ConnectorError> {
            Ok(())
        }
    }

    struct Out;

    #[async_trait]
    impl OutputTranslator for Out {
        type Protocol = u32;
        type Connector = u32;

        async fn to(&self, _access: &dyn ModelAccess, data: u32) -> Result<u32, ConnectorError> {
            Ok(data)
        }
    }

    struct In;

    #[async_trait]
    impl InputTranslator for In {
        type Connector = ();
        type Protocol = ();

        async fn from(&self, _access: &dyn ModelAccess, _data: ()) -> Result<(), ConnectorError> {
            Ok(())
        }
    }

    fn poll_control(driver: Arc<Ticks>) -> PollControl<Ticks, TranslatingProtocolAdapter<Out, In>> {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(AdapterSet::new(TranslatingProtocolAdapter::new(Out, In))),
            Arc::new(FirstAdapterSelector),
            None,
            "ticks".to_string(),
            "test".to_string(),
        ));
        PollControl::new(driver, dispatcher, Duration::from_millis(10), Span::none())
    }

    #[tokio::test]
    async fn closed_poller_is_not_restarted() {
        let driver = Arc::new(Ticks::default());
        let polling = poll_control(Arc::clone(&driver));

        polling.apply(NotificationMode::Polling);
        assert!(polling.is_running());
        polling.close();
        assert!(!polling.is_running());

        // 关闭后迟到的模式切换
        polling.apply(NotificationMode::Polling);
        assert!(!polling.is_running());
        let reads = driver.0.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(driver.0.load(Ordering::SeqCst), reads);
    }

    #[tokio::test]
    async fn stopped_poller_can_restart() {
        let polling = poll_control(Arc::new(Ticks::default()));
        polling.apply(NotificationMode::Polling);
        polling.apply(NotificationMode::Notifications);
        assert!(!polling.is_running());
        polling.apply(NotificationMode::Polling);
        assert!(polling.is_running());
        polling.close();
    }
}
