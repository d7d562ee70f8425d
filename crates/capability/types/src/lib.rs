//! # 类型翻译能力模块
//!
//! ```text
//! 命令 ──► InputTranslator ──► ModelAccess::set/call ──► 协议驱动
//! 协议驱动 ──► OutputTranslator ──► ModelAccess::get ──► 连接器输出
//! ```
//!
//! [`TranslatingProtocolAdapter`] 把两个方向组合成一个 [`ProtocolAdapter`]，
//! 并在连接期间持有当前的模型访问。连接器可以持有多个适配器
//! （[`AdapterSet`]），由 [`AdapterSelector`] 为每条数据选择其一。

mod adapter;
mod selector;
mod translator;

pub use adapter::{ProtocolAdapter, TranslatingProtocolAdapter};
pub use selector::{AdapterSelector, AdapterSet, FirstAdapterSelector};
pub use translator::{Field, InputTranslator, OutputTranslator, write_changed};
