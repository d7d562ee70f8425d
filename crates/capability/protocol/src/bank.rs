//! 进程内保持寄存器库
//!
//! 用于模拟从站或测试；克隆共享同一份存储。

use mconn_model::ConnectorError;
use std::sync::{Arc, Mutex};

use crate::layout::RegisterLayout;

#[derive(Debug, Clone)]
pub struct RegisterBank {
    registers: Arc<Mutex<Vec<u16>>>,
}

impl RegisterBank {
    pub fn new(size: usize) -> Self {
        Self {
            registers: Arc::new(Mutex::new(vec![0; size])),
        }
    }

    /// 刚好容纳布局中全部变量
    pub fn for_layout(layout: &RegisterLayout) -> Self {
        Self::new(layout.required_registers())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn read(&self, address: u16, count: u16) -> Result<Vec<u16>, ConnectorError> {
        let registers = self.lock();
        let range = Self::range(registers.len(), address, count)?;
        Ok(registers[range].to_vec())
    }

    pub fn write(&self, address: u16, words: &[u16]) -> Result<(), ConnectorError> {
        let mut registers = self.lock();
        let count = u16::try_from(words.len())
            .map_err(|_| ConnectorError::Protocol("too many registers".to_string()))?;
        let range = Self::range(registers.len(), address, count)?;
        registers[range].copy_from_slice(words);
        Ok(())
    }

    fn range(len: usize, address: u16, count: u16) -> Result<std::ops::Range<usize>, ConnectorError> {
        let start = usize::from(address);
        let end = start + usize::from(count);
        if end > len {
            return Err(ConnectorError::Protocol(format!(
                "illegal data address: {}..{} (bank size {})",
                start, end, len
            )));
        }
        Ok(start..end)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<u16>> {
        match self.registers.lock() {
            Ok(registers) => registers,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
