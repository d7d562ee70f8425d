//! 类型化接收回调。

use async_trait::async_trait;
use std::any::{Any, type_name};
use std::sync::Arc;

/// 接收异步转换后的设备输出。
#[async_trait]
pub trait ReceptionCallback<T>: Send + Sync {
    async fn received(&self, data: T);
}

#[async_trait]
impl<T, F> ReceptionCallback<T> for F
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync,
{
    async fn received(&self, data: T) {
        self(data)
    }
}

/// 擦除声明类型后的接收回调：运行时类型一致才调用。
#[async_trait]
pub(crate) trait Reception: Send + Sync {
    fn declared_type(&self) -> &'static str;

    /// 返回是否调用了回调。
    async fn dispatch(&self, data: Box<dyn Any + Send>) -> bool;
}

pub(crate) struct TypedReception<T> {
    callback: Arc<dyn ReceptionCallback<T>>,
}

impl<T: Send + 'static> TypedReception<T> {
    pub(crate) fn new(callback: Arc<dyn ReceptionCallback<T>>) -> Self {
        Self { callback }
    }
}

#[async_trait]
impl<T: Send + 'static> Reception for TypedReception<T> {
    fn declared_type(&self) -> &'static str {
        type_name::<T>()
    }

    async fn dispatch(&self, data: Box<dyn Any + Send>) -> bool {
        // 适配器输出本身是动态值时，按内层值的运行时类型匹配。
        let data = match data.downcast::<Box<dyn Any + Send>>() {
            Ok(inner) => *inner,
            Err(data) => data,
        };
        match data.downcast::<T>() {
            Ok(value) => {
                self.callback.received(*value).await;
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[tokio::test]
    async fn dispatches_matching_type_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: Arc<dyn ReceptionCallback<i32>> = Arc::new(move |value: i32| {
            sink.lock().expect("seen").push(value);
        });
        let reception = TypedReception::new(callback);

        assert!(reception.dispatch(Box::new(7i32)).await);
        assert!(!reception.dispatch(Box::new("text")).await);
        let dynamic: Box<dyn Any + Send> = Box::new(9i32);
        assert!(reception.dispatch(Box::new(dynamic)).await);

        assert_eq!(*seen.lock().expect("seen"), vec![7, 9]);
        assert_eq!(reception.declared_type(), "i32");
    }
}
