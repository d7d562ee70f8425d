//! 保持寄存器的读写通道：进程内寄存器库或 Modbus TCP 从站。

use crate::bank::RegisterBank;
use mconn_model::ConnectorError;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_modbus::client::{Context, tcp};
use tokio_modbus::prelude::*;
use tracing::{debug, info};

pub enum RegisterTransport {
    InMemory(RegisterBank),
    ModbusTcp(ModbusLink),
}

impl RegisterTransport {
    pub async fn read(&self, address: u16, count: u16) -> Result<Vec<u16>, ConnectorError> {
        match self {
            Self::InMemory(bank) => bank.read(address, count),
            Self::ModbusTcp(link) => link.read(address, count).await,
        }
    }

    pub async fn write(&self, address: u16, words: &[u16]) -> Result<(), ConnectorError> {
        match self {
            Self::InMemory(bank) => bank.write(address, words),
            Self::ModbusTcp(link) => link.write(address, words).await,
        }
    }

    pub async fn close(&self) {
        if let Self::ModbusTcp(link) = self {
            link.close().await;
        }
    }
}

/// Modbus TCP 客户端连接，请求串行执行。
pub struct ModbusLink {
    ctx: Mutex<Option<Context>>,
    addr: SocketAddr,
    timeout: Duration,
}

impl ModbusLink {
    /// 解析主机名并连接从站，超时视为连接失败。
    pub async fn connect(
        host: &str,
        port: u16,
        unit_id: u8,
        request_timeout: Duration,
    ) -> Result<Self, ConnectorError> {
        let addr = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(format!("{}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| {
                ConnectorError::ConnectionFailed(format!("{}:{}: no address", host, port))
            })?;

        info!(target: "mconn.protocol", %addr, unit_id, "connecting to modbus server");

        let ctx = timeout(request_timeout, tcp::connect_slave(addr, Slave(unit_id)))
            .await
            .map_err(|_| ConnectorError::ConnectionFailed(format!("{}: connect timed out", addr)))?
            .map_err(|e| ConnectorError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        info!(target: "mconn.protocol", %addr, "connected to modbus server");

        Ok(Self {
            ctx: Mutex::new(Some(ctx)),
            addr,
            timeout: request_timeout,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn read(&self, address: u16, count: u16) -> Result<Vec<u16>, ConnectorError> {
        let mut guard = self.ctx.lock().await;
        let ctx = guard.as_mut().ok_or(ConnectorError::NotConnected)?;

        let registers = timeout(self.timeout, ctx.read_holding_registers(address, count))
            .await
            .map_err(|_| ConnectorError::Timeout(format!("read {} x{}", address, count)))?
            .map_err(|e| ConnectorError::Protocol(e.to_string()))?
            .map_err(|e| ConnectorError::Protocol(format!("exception: {:?}", e)))?;

        debug!(
            target: "mconn.protocol",
            register = address,
            count,
            values = ?registers,
            "read modbus registers"
        );
        Ok(registers)
    }

    async fn write(&self, address: u16, words: &[u16]) -> Result<(), ConnectorError> {
        let mut guard = self.ctx.lock().await;
        let ctx = guard.as_mut().ok_or(ConnectorError::NotConnected)?;

        timeout(self.timeout, ctx.write_multiple_registers(address, words))
            .await
            .map_err(|_| ConnectorError::Timeout(format!("write {} x{}", address, words.len())))?
            .map_err(|e| ConnectorError::Protocol(e.to_string()))?
            .map_err(|e| ConnectorError::Protocol(format!("exception: {:?}", e)))?;

        debug!(
            target: "mconn.protocol",
            register = address,
            values = ?words,
            "wrote modbus registers"
        );
        Ok(())
    }

    /// 丢弃客户端连接；之后的请求返回 `NotConnected`。
    async fn close(&self) {
        if self.ctx.lock().await.take().is_some() {
            info!(target: "mconn.protocol", addr = %self.addr, "modbus connection closed");
        }
    }
}
