//! # 协议驱动模块
//!
//! 两类具体协议，均以 [`mconn_connector::ConnectorDriver`] 接入连接器：
//! - **寄存器协议**：按 `SERVER_STRUCTURE` 布局读写保持寄存器，
//!   数据源为进程内 [`RegisterBank`] 或 Modbus TCP 从站
//! - **属性模型**：以 `/` 分隔的层级属性与操作，支持监控推送
//!
//! ## 架构设计
//!
//! ```text
//! ConnectorParameter (specific settings)
//!       │
//!       ▼
//! RegisterSettings ──► RegisterLayout + WordOrder
//!       │
//!       ▼
//! RegisterDriver ──► RegisterModelAccess ──► RegisterTransport
//!                                                 ├── RegisterBank
//!                                                 └── ModbusLink (tokio-modbus)
//!
//! PropertyDriver ──► PropertyModelAccess ──► PropertyModel
//!                          │
//!                          └── ModelChange ──► Notifier
//! ```
//!
//! ## 配置格式
//!
//! ```json
//! {
//!   "SERVER_STRUCTURE": {
//!     "speed": {"offset": 0, "type": "short"},
//!     "total": {"offset": 1, "type": "uinteger"},
//!     "name": {"offset": 3, "type": "ascii", "count": 4}
//!   },
//!   "UNITID": 1,
//!   "TIMEOUT": 1000,
//!   "BIGBYTE": true
//! }
//! ```

pub mod access;
pub mod bank;
pub mod codec;
pub mod driver;
pub mod error;
pub mod layout;
pub mod property;
pub mod settings;
pub mod transport;

pub use access::{RegisterModelAccess, RegisterOutputConverter, RegisterSnapshot};
pub use bank::RegisterBank;
pub use codec::WordOrder;
pub use driver::RegisterDriver;
pub use error::CodecError;
pub use layout::{RegisterLayout, RegisterSpec, RegisterType};
pub use property::{
    ChangeKind, ModelChange, Operation, PropertyDriver, PropertyModel, PropertyModelAccess,
};
pub use settings::RegisterSettings;
pub use transport::{ModbusLink, RegisterTransport};
