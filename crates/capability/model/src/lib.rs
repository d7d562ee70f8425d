//! # 模型访问能力模块
//!
//! 协议无关的设备模型访问契约：
//! - **ModelAccess**：按限定名读写属性、调用操作、监控变化
//! - **AccessBase**：通知模式记录、作用域栈与限定名组合
//! - **TypeMappingAccess**：按值种类分派到类型化写入
//! - **InputConverter / OutputConverter**：默认类型转换
//!
//! ## 调用关系
//!
//! ```text
//! 类型翻译器 (mconn-types)
//!       │
//!       ▼
//! ModelAccess ──► AccessBase ──► ModeSignal ──► Connector
//!       │
//!       ▼
//! 协议驱动 (mconn-protocol)
//! ```

mod access;
mod base;
mod converter;
mod custom;
mod error;
mod optional;
mod type_mapping;

pub use access::ModelAccess;
pub use base::{AccessBase, ModeSignal};
pub use converter::{InputConverter, ModelInputConverter, ModelOutputConverter, OutputConverter};
pub use custom::{CustomType, get_struct_as, register_type, set_struct_from};
pub use error::ConnectorError;
pub use optional::optional;
pub use type_mapping::TypeMappingAccess;
