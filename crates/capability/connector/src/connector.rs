use crate::dispatch::{Dispatcher, PollControl};
use crate::driver::{ConnectorDriver, ModelContext, Notifier, OutputSink};
use crate::reception::{Reception, ReceptionCallback, TypedReception};
use domain::{ConnectorParameter, NotificationMode};
use mconn_model::{ConnectorError, ModeSignal, ModelAccess};
use mconn_telemetry::{connection_span, new_connection_id};
use mconn_types::{AdapterSelector, AdapterSet, FirstAdapterSelector, ProtocolAdapter};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tracing::{Instrument, info, warn};

/// 连接器状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connected,
}

struct Session<D, A>
where
    D: ConnectorDriver,
    A: ProtocolAdapter<ProtocolOutput = D::Output>,
{
    access: Arc<dyn ModelAccess>,
    dispatcher: Arc<Dispatcher<A>>,
    polling: Arc<PollControl<D, A>>,
    watcher: JoinHandle<()>,
    parameter: ConnectorParameter,
    connection_id: String,
}

/// 接收回调与占用标记，二者在同一把锁下读写。
#[derive(Default)]
struct ReceptionSlot {
    callback: Option<Arc<dyn Reception>>,
    /// 从 `connect` 开始到 `disconnect` 结束为 true
    active: bool,
}

/// 连接器：拥有驱动、一组适配器与当前连接的模型访问。
///
/// 生命周期为 `Disconnected → Connected → Disconnected`，可重复连接，
/// 每次连接都会得到新的模型访问实例。
///
/// 模型访问绑定到全部适配器，连接时每个适配器都执行一次初始化；
/// 每条协议输出与每条写入命令由 [`AdapterSelector`] 选定一个适配器处理。
///
/// 接收回调不得在回调内部断开同一个连接器：`disconnect` 会等待所有进行中的
/// 交付结束。
pub struct Connector<D, A>
where
    D: ConnectorDriver,
    A: ProtocolAdapter<ProtocolOutput = D::Output, ProtocolInput = D::Input>,
{
    driver: Arc<D>,
    adapters: Arc<AdapterSet<A>>,
    selector: Arc<dyn AdapterSelector<A>>,
    reception: Mutex<ReceptionSlot>,
    session: tokio::sync::Mutex<Option<Session<D, A>>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl<D, A> Connector<D, A>
where
    D: ConnectorDriver,
    A: ProtocolAdapter<ProtocolOutput = D::Output, ProtocolInput = D::Input>,
{
    /// 单个适配器，总是选择它。
    pub fn new(driver: D, adapter: A) -> Self {
        Self::with_adapters(driver, AdapterSet::new(adapter), FirstAdapterSelector)
    }

    pub fn with_adapters<S>(driver: D, adapters: AdapterSet<A>, selector: S) -> Self
    where
        S: AdapterSelector<A>,
    {
        Self {
            driver: Arc::new(driver),
            adapters: Arc::new(adapters),
            selector: Arc::new(selector),
            reception: Mutex::new(ReceptionSlot::default()),
            session: tokio::sync::Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        self.driver.name()
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// 首个适配器
    pub fn adapter(&self) -> &A {
        self.adapters.first()
    }

    pub fn adapters(&self) -> &AdapterSet<A> {
        &self.adapters
    }

    fn reception_slot(&self) -> MutexGuard<'_, ReceptionSlot> {
        match self.reception.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn release(&self) {
        self.reception_slot().active = false;
    }

    fn unbind_all(&self) {
        for adapter in self.adapters.iter() {
            adapter.unbind_model_access();
        }
    }

    /// 设置接收回调（只能在连接前设置，重复设置会替换之前的回调）。
    ///
    /// 只有运行时类型为 `T` 的适配输出才会交给回调，其他输出被静默跳过。
    pub fn set_reception_callback<T, C>(&self, callback: C) -> Result<(), ConnectorError>
    where
        T: Send + 'static,
        C: ReceptionCallback<T> + 'static,
    {
        let mut slot = self.reception_slot();
        if slot.active {
            return Err(ConnectorError::IllegalState(
                "reception callback must be set before connect".to_string(),
            ));
        }
        let callback: Arc<dyn ReceptionCallback<T>> = Arc::new(callback);
        slot.callback = Some(Arc::new(TypedReception::new(callback)));
        Ok(())
    }

    /// 建立连接。
    ///
    /// 依次创建模型访问、绑定全部适配器、逐个执行输出翻译器初始化，再按得到的
    /// 通知模式启动轮询（未设置时默认轮询）。
    pub async fn connect(&self, parameter: ConnectorParameter) -> Result<(), ConnectorError> {
        let mut slot = self.session.lock().await;
        if slot.is_some() {
            return Err(ConnectorError::IllegalState(format!(
                "connector {} already connected",
                self.name()
            )));
        }

        let connection_id = new_connection_id();
        let reception = {
            let mut slot = self.reception_slot();
            slot.active = true;
            slot.callback.clone()
        };
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&self.adapters),
            Arc::clone(&self.selector),
            reception,
            self.name().to_string(),
            connection_id.clone(),
        ));
        let (mode_signal, mut modes) = ModeSignal::channel();
        let sink: Arc<dyn OutputSink<D::Output>> = dispatcher.clone();
        let context = ModelContext {
            mode_signal,
            notifier: Notifier::new(sink),
        };

        let access = match self.driver.connect_impl(&parameter, context).await {
            Ok(access) => access,
            Err(err) => {
                dispatcher.close().await;
                self.release();
                warn!(
                    target: "mconn.connector",
                    connector = %self.name(),
                    endpoint = %parameter.endpoint_url(),
                    error = %err,
                    "connector_connect_failed"
                );
                return Err(err);
            }
        };
        for adapter in self.adapters.iter() {
            adapter.bind_model_access(Arc::clone(&access));
        }
        let mut initialized = Ok(());
        for adapter in self.adapters.iter() {
            initialized = adapter.initialize_model_access().await;
            if initialized.is_err() {
                break;
            }
        }
        if let Err(err) = initialized {
            dispatcher.close().await;
            self.unbind_all();
            let _ = access.dispose().await;
            let _ = self.driver.disconnect_impl().await;
            self.release();
            warn!(
                target: "mconn.connector",
                connector = %self.name(),
                error = %err,
                "connector_initialize_failed"
            );
            return Err(err);
        }

        // 初始化期间的切换已体现在访问层的当前模式中。
        while modes.try_recv().is_ok() {}
        let mode = access
            .base()
            .notification_mode()
            .unwrap_or(NotificationMode::Polling);
        let span = connection_span(self.name(), &connection_id);
        let polling = Arc::new(PollControl::new(
            Arc::clone(&self.driver),
            Arc::clone(&dispatcher),
            parameter.notification_interval(),
            span.clone(),
        ));
        polling.apply(mode);
        let watcher = {
            let polling = Arc::clone(&polling);
            tokio::spawn(
                async move {
                    while let Some(mode) = modes.recv().await {
                        polling.apply(mode);
                    }
                }
                .instrument(span),
            )
        };

        info!(
            target: "mconn.connector",
            connector = %self.name(),
            connection_id = %connection_id,
            endpoint = %parameter.endpoint_url(),
            mode = ?mode,
            adapters = self.adapters.len(),
            "connector_connected"
        );
        *slot = Some(Session {
            access,
            dispatcher,
            polling,
            watcher,
            parameter,
            connection_id,
        });
        Ok(())
    }

    /// 写入命令：适配输入后交给驱动。
    ///
    /// 同一连接器同一时刻只有一个写入在执行；超过请求超时返回 `Timeout`
    /// （超时为 0 表示不限时）。不重试。
    pub async fn write(&self, data: A::ConnectorInput) -> Result<(), ConnectorError> {
        let _guard = self.write_lock.lock().await;
        let timeout = {
            let session = self.session.lock().await;
            session
                .as_ref()
                .ok_or(ConnectorError::NotConnected)?
                .parameter
                .request_timeout()
        };
        let write = async {
            let adapter = self.selector.select_input(&data, &self.adapters);
            let input = adapter.adapt_input(data).await?;
            self.driver.write_impl(input).await
        };
        if timeout.is_zero() {
            return write.await;
        }
        match tokio::time::timeout(timeout, write).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    target: "mconn.connector",
                    connector = %self.name(),
                    timeout_ms = timeout.as_millis() as u64,
                    "connector_write_timeout"
                );
                Err(ConnectorError::Timeout(format!(
                    "write exceeded {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }

    /// 立即读取一次并分发；返回是否到达了接收回调。
    pub async fn poll_once(&self) -> Result<bool, ConnectorError> {
        let dispatcher = {
            let session = self.session.lock().await;
            Arc::clone(&session.as_ref().ok_or(ConnectorError::NotConnected)?.dispatcher)
        };
        match self.driver.read().await? {
            Some(data) => Ok(dispatcher.dispatch(data).await),
            None => Ok(false),
        }
    }

    /// 断开连接。
    ///
    /// 返回后不会再有接收回调开始或仍在执行；旧连接的通知器失效。
    /// 未连接时直接返回。
    pub async fn disconnect(&self) -> Result<(), ConnectorError> {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.take() else {
            return Ok(());
        };
        session.dispatcher.close().await;
        session.watcher.abort();
        session.polling.close();
        self.unbind_all();
        let disposed = session.access.dispose().await;
        let closed = self.driver.disconnect_impl().await;
        self.release();
        info!(
            target: "mconn.connector",
            connector = %self.name(),
            connection_id = %session.connection_id,
            "connector_disconnected"
        );
        disposed.and(closed)
    }

    pub async fn state(&self) -> ConnectorState {
        if self.session.lock().await.is_some() {
            ConnectorState::Connected
        } else {
            ConnectorState::Disconnected
        }
    }

    pub async fn is_polling(&self) -> bool {
        self.session
            .lock()
            .await
            .as_ref()
            .is_some_and(|session| session.polling.is_running())
    }

    pub async fn connection_id(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.connection_id.clone())
    }

    /// 当前连接的模型访问。
    pub fn model_access(&self) -> Option<Arc<dyn ModelAccess>> {
        self.adapters.first().model_access()
    }
}
