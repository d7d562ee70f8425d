//! 各协议访问层共享的状态：分隔符、连接参数、通知模式与作用域栈。

use domain::{ConnectorParameter, NotificationMode, compose_qname};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

/// 通知模式切换信号（发送端）。
///
/// 访问层每次实际切换模式时发送一条 [`NotificationMode`]，连接器侧据此
/// 安装或卸载轮询任务。
#[derive(Debug, Clone)]
pub struct ModeSignal {
    sender: mpsc::UnboundedSender<NotificationMode>,
}

impl ModeSignal {
    /// 创建信号与对应的接收端。
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<NotificationMode>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, mode: NotificationMode) {
        // 接收端已关闭（连接器已断开）时丢弃。
        let _ = self.sender.send(mode);
    }
}

/// 模型访问基础状态，由每个协议访问层内嵌并通过 `ModelAccess::base` 暴露。
#[derive(Debug)]
pub struct AccessBase {
    separator: String,
    top_instances: String,
    parameter: ConnectorParameter,
    notifications: Mutex<Option<bool>>,
    detail_notified_item: AtomicBool,
    mode_signal: Option<ModeSignal>,
    scope: Mutex<Vec<String>>,
}

impl AccessBase {
    pub fn new(separator: impl Into<String>, parameter: ConnectorParameter) -> Self {
        Self {
            separator: separator.into(),
            top_instances: String::new(),
            parameter,
            notifications: Mutex::new(None),
            detail_notified_item: AtomicBool::new(false),
            mode_signal: None,
            scope: Mutex::new(Vec::new()),
        }
    }

    /// 设置实例前缀（`iqname` 使用）。
    pub fn with_top_instances(mut self, top_instances: impl Into<String>) -> Self {
        self.top_instances = top_instances.into();
        self
    }

    pub fn with_mode_signal(mut self, signal: ModeSignal) -> Self {
        self.mode_signal = Some(signal);
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn top_instances(&self) -> &str {
        &self.top_instances
    }

    pub fn parameter(&self) -> &ConnectorParameter {
        &self.parameter
    }

    pub fn notification_interval(&self) -> Duration {
        self.parameter.notification_interval()
    }

    /// 切换通知模式。
    ///
    /// 仅当新值与当前记录不同（首次设置视为从“未设置”变化）时发送一次
    /// 切换信号；返回是否发生了切换。
    pub fn use_notifications(&self, notifications: bool) -> bool {
        let changed = {
            let mut current = match self.notifications.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if *current == Some(notifications) {
                false
            } else {
                *current = Some(notifications);
                true
            }
        };
        if changed {
            if let Some(signal) = &self.mode_signal {
                signal.send(NotificationMode::from_notifications(notifications));
            }
        }
        changed
    }

    /// 当前通知模式；从未设置时为 `None`。
    pub fn notification_mode(&self) -> Option<NotificationMode> {
        self.notifications
            .lock()
            .map(|guard| guard.map(NotificationMode::from_notifications))
            .unwrap_or(None)
    }

    pub fn set_detail_notified_item(&self, detail: bool) {
        self.detail_notified_item.store(detail, Ordering::SeqCst);
    }

    pub fn is_detail_notified_item(&self) -> bool {
        self.detail_notified_item.load(Ordering::SeqCst)
    }

    /// 进入子作用域。
    pub fn step_into(&self, name: &str) {
        if let Ok(mut scope) = self.scope.lock() {
            scope.push(name.to_string());
        }
    }

    /// 离开当前作用域，返回离开的名称；已在根作用域时返回 `None`。
    pub fn step_out(&self) -> Option<String> {
        self.scope.lock().ok().and_then(|mut scope| scope.pop())
    }

    /// 当前作用域限定名（根作用域为空串）。
    pub fn scope(&self) -> String {
        let scope = match self.scope.lock() {
            Ok(scope) => scope,
            Err(poisoned) => poisoned.into_inner(),
        };
        let names: Vec<&str> = scope.iter().map(String::as_str).collect();
        compose_qname(&self.separator, &names)
    }

    /// 按当前作用域解析限定名。
    pub fn resolve(&self, qname: &str) -> String {
        compose_qname(&self.separator, &[&self.scope(), qname])
    }
}
