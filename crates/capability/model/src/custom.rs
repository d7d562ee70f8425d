//! 强类型自定义结构体与 [`StructValue`] 之间的桥接。

use crate::access::ModelAccess;
use crate::error::ConnectorError;
use domain::{StructDescriptor, StructValue};

/// 可映射为协议结构体的 Rust 类型。
pub trait CustomType: Sized {
    fn descriptor() -> StructDescriptor;

    fn to_struct(&self) -> StructValue;

    fn from_struct(value: &StructValue) -> Result<Self, ConnectorError>;
}

/// 注册 `T` 的结构体声明。
pub async fn register_type<T: CustomType>(access: &dyn ModelAccess) -> Result<(), ConnectorError> {
    access.register_custom_type(T::descriptor()).await
}

pub async fn get_struct_as<T: CustomType>(
    access: &dyn ModelAccess,
    qname: &str,
) -> Result<T, ConnectorError> {
    let descriptor = T::descriptor();
    let value = access.get_struct(qname, &descriptor.type_name).await?;
    T::from_struct(&value)
}

pub async fn set_struct_from<T: CustomType>(
    access: &dyn ModelAccess,
    qname: &str,
    value: &T,
) -> Result<(), ConnectorError> {
    access.set_struct(qname, value.to_struct()).await
}
