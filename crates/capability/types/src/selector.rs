//! 多适配器与适配器选择。

use crate::adapter::ProtocolAdapter;
use std::sync::Arc;

/// 非空的适配器集合：至少包含首个适配器。
pub struct AdapterSet<A> {
    first: Arc<A>,
    others: Vec<Arc<A>>,
}

impl<A: ProtocolAdapter> AdapterSet<A> {
    pub fn new(first: A) -> Self {
        Self {
            first: Arc::new(first),
            others: Vec::new(),
        }
    }

    pub fn with_adapter(mut self, adapter: A) -> Self {
        self.others.push(Arc::new(adapter));
        self
    }

    pub fn first(&self) -> &Arc<A> {
        &self.first
    }

    /// 按加入顺序取适配器，0 为首个适配器。
    pub fn get(&self, index: usize) -> Option<&Arc<A>> {
        match index {
            0 => Some(&self.first),
            n => self.others.get(n - 1),
        }
    }

    pub fn len(&self) -> usize {
        1 + self.others.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<A>> {
        std::iter::once(&self.first).chain(self.others.iter())
    }
}

/// 为每条协议输出与每条连接器输入选择适配器。
///
/// 默认实现总是选择首个适配器。
pub trait AdapterSelector<A: ProtocolAdapter>: Send + Sync + 'static {
    fn select_output<'a>(
        &self,
        _data: &A::ProtocolOutput,
        adapters: &'a AdapterSet<A>,
    ) -> &'a Arc<A> {
        adapters.first()
    }

    fn select_input<'a>(
        &self,
        _data: &A::ConnectorInput,
        adapters: &'a AdapterSet<A>,
    ) -> &'a Arc<A> {
        adapters.first()
    }
}

/// 总是选择首个适配器。
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAdapterSelector;

impl<A: ProtocolAdapter> AdapterSelector<A> for FirstAdapterSelector {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::{InputTranslator, OutputTranslator};
    use crate::TranslatingProtocolAdapter;
    use async_trait::async_trait;
    use mconn_model::{ConnectorError, ModelAccess};

    struct Scale(u32);

    #[async_trait]
    impl OutputTranslator for Scale {
        type Protocol = u32;
        type Connector = u32;

        async fn to(&self, _access: &dyn ModelAccess, data: u32) -> Result<u32, ConnectorError> {
            Ok(data * self.0)
        }
    }

    struct Echo;

    #[async_trait]
    impl InputTranslator for Echo {
        type Connector = i32;
        type Protocol = i32;

        async fn from(&self, _access: &dyn ModelAccess, data: i32) -> Result<i32, ConnectorError> {
            Ok(data)
        }
    }

    type Adapter = TranslatingProtocolAdapter<Scale, Echo>;

    /// 奇数输出交给第二个适配器。
    struct ByParity;

    impl AdapterSelector<Adapter> for ByParity {
        fn select_output<'a>(&self, data: &u32, adapters: &'a AdapterSet<Adapter>) -> &'a Arc<Adapter> {
            adapters
                .get((*data % 2) as usize)
                .unwrap_or_else(|| adapters.first())
        }
    }

    fn set() -> AdapterSet<Adapter> {
        AdapterSet::new(TranslatingProtocolAdapter::new(Scale(1), Echo))
            .with_adapter(TranslatingProtocolAdapter::new(Scale(10), Echo))
    }

    #[test]
    fn set_keeps_insertion_order() {
        let adapters = set();
        assert_eq!(adapters.len(), 2);
        assert!(Arc::ptr_eq(adapters.first(), adapters.get(0).expect("first")));
        assert_eq!(adapters.iter().count(), 2);
        assert!(adapters.get(2).is_none());
    }

    #[test]
    fn default_selector_picks_the_first_adapter() {
        let adapters = set();
        let selector = FirstAdapterSelector;
        assert!(Arc::ptr_eq(
            AdapterSelector::<Adapter>::select_output(&selector, &7, &adapters),
            adapters.first()
        ));
        assert!(Arc::ptr_eq(
            AdapterSelector::<Adapter>::select_input(&selector, &-1, &adapters),
            adapters.first()
        ));
    }

    #[test]
    fn custom_selector_routes_by_data() {
        let adapters = set();
        let odd = ByParity.select_output(&3, &adapters);
        assert!(Arc::ptr_eq(odd, adapters.get(1).expect("second")));
        let even = ByParity.select_output(&4, &adapters);
        assert!(Arc::ptr_eq(even, adapters.first()));
    }
}
