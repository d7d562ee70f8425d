use crate::error::ConnectorError;
use std::future::Future;

/// 执行非必需操作。
///
/// 成功返回 `Ok(true)`；不支持或超出范围的失败返回 `Ok(false)`，
/// 其他错误原样返回。
pub async fn optional<T, F>(operation: F) -> Result<bool, ConnectorError>
where
    F: Future<Output = Result<T, ConnectorError>>,
{
    match operation.await {
        Ok(_) => Ok(true),
        Err(err) if err.is_optional_failure() => {
            tracing::debug!(target: "mconn.connector", error = %err, "optional_operation_skipped");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}
