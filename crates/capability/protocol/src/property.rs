//! 层级属性模型
//!
//! 以 `/` 分隔的属性树，支持结构体（已注册的自定义类型）、多值、可调用操作。
//! 模型变化经广播通道发出；[`PropertyModelAccess`] 按监控集合过滤后通过连接器
//! 的 [`Notifier`] 推送 [`ModelChange`]。

use async_trait::async_trait;
use domain::{ConnectorParameter, StructDescriptor, StructValue, Value};
use mconn_connector::{ConnectorDriver, ModelContext, Notifier};
use mconn_model::{AccessBase, ConnectorError, ModeSignal, ModelAccess};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const PROPERTY_SEPARATOR: &str = "/";

const EVENT_CAPACITY: usize = 256;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// 可调用操作
pub type Operation = Arc<dyn Fn(&[Value]) -> Result<Value, ConnectorError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// 轮询触发，不携带元素信息
    Poll,
    /// 属性值变化
    Value,
    /// 属性或操作的增删
    Structure,
}

/// 推送给接收方的模型变化
#[derive(Debug, Clone, PartialEq)]
pub struct ModelChange {
    pub kind: ChangeKind,
    pub qname: Option<String>,
    pub value: Option<Value>,
}

impl ModelChange {
    pub fn poll() -> Self {
        Self {
            kind: ChangeKind::Poll,
            qname: None,
            value: None,
        }
    }

    fn value(qname: &str, value: Value) -> Self {
        Self {
            kind: ChangeKind::Value,
            qname: Some(qname.to_string()),
            value: Some(value),
        }
    }

    fn structure(qname: &str, value: Option<Value>) -> Self {
        Self {
            kind: ChangeKind::Structure,
            qname: Some(qname.to_string()),
            value,
        }
    }

    /// 去掉元素信息，只保留变化种类。
    fn without_detail(self) -> Self {
        Self {
            kind: self.kind,
            qname: None,
            value: None,
        }
    }
}

struct ModelState {
    properties: RwLock<BTreeMap<String, Value>>,
    operations: RwLock<BTreeMap<String, Operation>>,
    events: broadcast::Sender<ModelChange>,
}

/// 进程内属性树；克隆共享同一份模型。
#[derive(Clone)]
pub struct PropertyModel {
    state: Arc<ModelState>,
}

impl Default for PropertyModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PropertyModel {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(ModelState {
                properties: RwLock::new(BTreeMap::new()),
                operations: RwLock::new(BTreeMap::new()),
                events,
            }),
        }
    }

    pub fn with_property(self, qname: &str, value: impl Into<Value>) -> Self {
        self.define(qname, value.into());
        self
    }

    pub fn with_operation<F>(self, qname: &str, operation: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, ConnectorError> + Send + Sync + 'static,
    {
        self.define_operation(qname, operation);
        self
    }

    /// 新增或覆盖属性。新增时发出结构变化，覆盖时发出值变化。
    pub fn define(&self, qname: &str, value: Value) {
        let previous = match self.state.properties.write() {
            Ok(mut properties) => properties.insert(qname.to_string(), value.clone()),
            Err(poisoned) => poisoned.into_inner().insert(qname.to_string(), value.clone()),
        };
        let change = match previous {
            Some(_) => ModelChange::value(qname, value),
            None => ModelChange::structure(qname, Some(value)),
        };
        self.publish(change);
    }

    /// 更新已有属性。
    pub fn update(&self, qname: &str, value: Value) -> Result<(), ConnectorError> {
        {
            let mut properties = match self.state.properties.write() {
                Ok(properties) => properties,
                Err(poisoned) => poisoned.into_inner(),
            };
            let Some(slot) = properties.get_mut(qname) else {
                return Err(ConnectorError::UnknownElement(qname.to_string()));
            };
            *slot = value.clone();
        }
        self.publish(ModelChange::value(qname, value));
        Ok(())
    }

    pub fn remove(&self, qname: &str) -> Option<Value> {
        let removed = match self.state.properties.write() {
            Ok(mut properties) => properties.remove(qname),
            Err(poisoned) => poisoned.into_inner().remove(qname),
        };
        if removed.is_some() {
            self.publish(ModelChange::structure(qname, None));
        }
        removed
    }

    pub fn define_operation<F>(&self, qname: &str, operation: F)
    where
        F: Fn(&[Value]) -> Result<Value, ConnectorError> + Send + Sync + 'static,
    {
        let operation: Operation = Arc::new(operation);
        match self.state.operations.write() {
            Ok(mut operations) => operations.insert(qname.to_string(), operation),
            Err(poisoned) => poisoned.into_inner().insert(qname.to_string(), operation),
        };
        self.publish(ModelChange::structure(qname, None));
    }

    pub fn value(&self, qname: &str) -> Option<Value> {
        match self.state.properties.read() {
            Ok(properties) => properties.get(qname).cloned(),
            Err(poisoned) => poisoned.into_inner().get(qname).cloned(),
        }
    }

    pub fn contains(&self, qname: &str) -> bool {
        self.value(qname).is_some()
    }

    pub fn names(&self) -> Vec<String> {
        match self.state.properties.read() {
            Ok(properties) => properties.keys().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().keys().cloned().collect(),
        }
    }

    fn operation(&self, qname: &str) -> Option<Operation> {
        match self.state.operations.read() {
            Ok(operations) => operations.get(qname).cloned(),
            Err(poisoned) => poisoned.into_inner().get(qname).cloned(),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ModelChange> {
        self.state.events.subscribe()
    }

    fn publish(&self, change: ModelChange) {
        // 无订阅者时发送失败，忽略
        let _ = self.state.events.send(change);
    }
}

struct Shared {
    base: AccessBase,
    model: PropertyModel,
    notifier: Notifier<ModelChange>,
    types: Mutex<BTreeMap<String, StructDescriptor>>,
    /// 受监控的属性及其请求的间隔
    monitored: Mutex<BTreeMap<String, Duration>>,
    /// 结构变化监控的间隔，`None` 表示未监控
    structure: Mutex<Option<Duration>>,
}

impl Shared {
    fn accepts(&self, change: &ModelChange) -> bool {
        match change.kind {
            ChangeKind::Poll => false,
            ChangeKind::Structure => lock(&self.structure).is_some(),
            ChangeKind::Value => change
                .qname
                .as_ref()
                .is_some_and(|qname| lock(&self.monitored).contains_key(qname)),
        }
    }

    /// 当前采样周期：所有监控请求中最短的间隔。
    fn period(&self) -> Duration {
        let structure = *lock(&self.structure);
        lock(&self.monitored)
            .values()
            .copied()
            .chain(structure)
            .min()
            .unwrap_or(Duration::ZERO)
    }

    async fn push(&self, change: ModelChange) {
        let change = if self.base.is_detail_notified_item() {
            change
        } else {
            change.without_detail()
        };
        self.notifier.notify(change).await;
    }
}

/// 同一周期内同一属性的多次值变化只保留最后一次。
fn coalesce(batch: Vec<ModelChange>) -> Vec<ModelChange> {
    let mut merged: Vec<ModelChange> = Vec::with_capacity(batch.len());
    for change in batch {
        let existing = merged.iter_mut().find(|seen| {
            seen.kind == ChangeKind::Value && change.kind == ChangeKind::Value && seen.qname == change.qname
        });
        match existing {
            Some(seen) => *seen = change,
            None => merged.push(change),
        }
    }
    merged
}

/// 每个周期收集一次模型变化并推送；周期为 0 时逐条推送。
///
/// 周期在每批开始时从监控状态读取，监控请求的变化不会中断正在收集的一批。
async fn forward(shared: Arc<Shared>, mut events: broadcast::Receiver<ModelChange>) {
    loop {
        let first = match events.recv().await {
            Ok(change) => change,
            Err(RecvError::Lagged(skipped)) => {
                warn!(target: "mconn.protocol", skipped, "model_changes_lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let mut batch = vec![first];
        let period = shared.period();
        if !period.is_zero() {
            tokio::time::sleep(period).await;
            loop {
                match events.try_recv() {
                    Ok(change) => batch.push(change),
                    Err(TryRecvError::Lagged(skipped)) => {
                        warn!(target: "mconn.protocol", skipped, "model_changes_lagged");
                    }
                    Err(_) => break,
                }
            }
        }
        for change in coalesce(batch) {
            if shared.accepts(&change) {
                shared.push(change).await;
            }
        }
    }
}

/// 属性模型的访问层
///
/// 首次监控请求时启动唯一的推送任务，之后的请求只更新监控集合与间隔。
pub struct PropertyModelAccess {
    shared: Arc<Shared>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl PropertyModelAccess {
    pub fn new(
        model: PropertyModel,
        parameter: ConnectorParameter,
        top_instances: &str,
        notifier: Notifier<ModelChange>,
        mode_signal: ModeSignal,
    ) -> Self {
        let base = AccessBase::new(PROPERTY_SEPARATOR, parameter)
            .with_top_instances(top_instances)
            .with_mode_signal(mode_signal);
        Self {
            shared: Arc::new(Shared {
                base,
                model,
                notifier,
                types: Mutex::new(BTreeMap::new()),
                monitored: Mutex::new(BTreeMap::new()),
                structure: Mutex::new(None),
            }),
            forwarder: Mutex::new(None),
        }
    }

    pub fn monitored(&self) -> Vec<String> {
        lock(&self.shared.monitored).keys().cloned().collect()
    }

    /// 当前推送采样周期
    pub fn sampling_period(&self) -> Duration {
        self.shared.period()
    }

    fn existing(&self, qname: &str) -> Result<(String, Value), ConnectorError> {
        let name = self.shared.base.resolve(qname);
        match self.shared.model.value(&name) {
            Some(value) => Ok((name, value)),
            None => Err(ConnectorError::UnknownElement(name)),
        }
    }

    fn descriptor(&self, type_name: &str) -> Result<StructDescriptor, ConnectorError> {
        lock(&self.shared.types)
            .get(type_name)
            .cloned()
            .ok_or_else(|| ConnectorError::UnknownElement(format!("type {}", type_name)))
    }

    /// 推送任务未运行时启动它；已运行时保持不变。
    fn ensure_forwarder(&self) {
        let mut forwarder = lock(&self.forwarder);
        if forwarder.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let events = self.shared.model.subscribe();
        *forwarder = Some(tokio::spawn(forward(Arc::clone(&self.shared), events)));
        debug!(target: "mconn.protocol", "model_forwarder_started");
    }

    fn stop_forwarder(&self) {
        if let Some(task) = lock(&self.forwarder).take() {
            task.abort();
        }
    }
}

impl Drop for PropertyModelAccess {
    fn drop(&mut self) {
        self.stop_forwarder();
    }
}

#[async_trait]
impl ModelAccess for PropertyModelAccess {
    fn base(&self) -> &AccessBase {
        &self.shared.base
    }

    async fn get(&self, qname: &str) -> Result<Value, ConnectorError> {
        self.existing(qname).map(|(_, value)| value)
    }

    async fn set(&self, qname: &str, value: Value) -> Result<(), ConnectorError> {
        let name = self.shared.base.resolve(qname);
        self.shared.model.update(&name, value)
    }

    async fn call(&self, qname: &str, args: Vec<Value>) -> Result<Value, ConnectorError> {
        let name = self.shared.base.resolve(qname);
        let operation = self
            .shared
            .model
            .operation(&name)
            .ok_or(ConnectorError::UnknownElement(name))?;
        operation(args.as_slice())
    }

    async fn get_struct(&self, qname: &str, type_name: &str) -> Result<StructValue, ConnectorError> {
        let descriptor = self.descriptor(type_name)?;
        let (name, value) = self.existing(qname)?;
        let value = self.input_converter().to_struct(&value)?;
        descriptor
            .validate(&value)
            .map_err(|reason| ConnectorError::ConversionFailed(format!("{}: {}", name, reason)))?;
        Ok(value)
    }

    async fn set_struct(&self, qname: &str, value: StructValue) -> Result<(), ConnectorError> {
        let descriptor = self.descriptor(&value.type_name)?;
        let name = self.shared.base.resolve(qname);
        descriptor
            .validate(&value)
            .map_err(|reason| ConnectorError::ConversionFailed(format!("{}: {}", name, reason)))?;
        self.shared.model.update(&name, self.output_converter().from_struct(value))
    }

    async fn register_custom_type(&self, descriptor: StructDescriptor) -> Result<(), ConnectorError> {
        lock(&self.shared.types).insert(descriptor.type_name.clone(), descriptor);
        Ok(())
    }

    async fn get_multi_value(&self, qname: &str) -> Result<Vec<Value>, ConnectorError> {
        let (_, value) = self.existing(qname)?;
        self.input_converter().to_list(&value)
    }

    async fn set_multi_value(&self, qname: &str, values: Vec<Value>) -> Result<(), ConnectorError> {
        let value = self.output_converter().from_list(values);
        self.set(qname, value).await
    }

    async fn monitor_with_interval(
        &self,
        interval: Duration,
        qnames: &[&str],
    ) -> Result<(), ConnectorError> {
        let mut resolved = Vec::with_capacity(qnames.len());
        for qname in qnames {
            let (name, _) = self.existing(qname)?;
            resolved.push((name, interval));
        }
        lock(&self.shared.monitored).extend(resolved);
        self.ensure_forwarder();
        debug!(
            target: "mconn.protocol",
            period_ms = self.sampling_period().as_millis() as u64,
            "model_monitor_updated"
        );
        Ok(())
    }

    async fn monitor_model_changes_with_interval(
        &self,
        interval: Duration,
    ) -> Result<(), ConnectorError> {
        *lock(&self.shared.structure) = Some(interval);
        self.ensure_forwarder();
        Ok(())
    }

    async fn dispose(&self) -> Result<(), ConnectorError> {
        self.stop_forwarder();
        lock(&self.shared.monitored).clear();
        *lock(&self.shared.structure) = None;
        Ok(())
    }
}

/// 把 [`PropertyModel`] 作为连接器驱动
pub struct PropertyDriver {
    model: PropertyModel,
    top_instances: String,
    connected: AtomicBool,
}

impl PropertyDriver {
    pub fn new(model: PropertyModel) -> Self {
        Self {
            model,
            top_instances: String::new(),
            connected: AtomicBool::new(false),
        }
    }

    pub fn with_top_instances(mut self, top_instances: impl Into<String>) -> Self {
        self.top_instances = top_instances.into();
        self
    }

    pub fn model(&self) -> &PropertyModel {
        &self.model
    }
}

#[async_trait]
impl ConnectorDriver for PropertyDriver {
    type Output = ModelChange;
    type Input = ();

    fn name(&self) -> &str {
        "property-model"
    }

    async fn connect_impl(
        &self,
        parameter: &ConnectorParameter,
        context: ModelContext<ModelChange>,
    ) -> Result<Arc<dyn ModelAccess>, ConnectorError> {
        let access = PropertyModelAccess::new(
            self.model.clone(),
            parameter.clone(),
            &self.top_instances,
            context.notifier,
            context.mode_signal,
        );
        self.connected.store(true, Ordering::SeqCst);
        info!(
            target: "mconn.protocol",
            properties = self.model.names().len(),
            "property_session_opened"
        );
        Ok(Arc::new(access))
    }

    async fn read(&self) -> Result<Option<ModelChange>, ConnectorError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(ConnectorError::NotConnected);
        }
        Ok(Some(ModelChange::poll()))
    }

    async fn write_impl(&self, _data: ()) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn disconnect_impl(&self) -> Result<(), ConnectorError> {
        self.connected.store(false, Ordering::SeqCst);
        info!(target: "mconn.protocol", "property_session_closed");
        Ok(())
    }
}
