//! Scoped, revocable read access to the game process.
//!
//! A [`ProcessContext`] is the only thing the decoding layers read through.
//! It rejects null and out-of-range addresses before they reach the OS, and
//! once released (explicitly or on drop) every read fails with
//! [`Error::ContextClosed`].

use tracing::debug;

use crate::error::{Error, Result};
use crate::memory::layout::bounds;
use crate::memory::{MemoryReader, ProcessHandle, ProcessInfo, ProcessSelector, ReadMemory};

pub struct ProcessContext<R: ReadMemory> {
    reader: Option<R>,
    info: ProcessInfo,
}

impl<R: ReadMemory> ProcessContext<R> {
    pub fn new(reader: R, info: ProcessInfo) -> Self {
        Self {
            reader: Some(reader),
            info,
        }
    }

    pub fn info(&self) -> &ProcessInfo {
        &self.info
    }

    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Drop the underlying reader. Further reads fail with `ContextClosed`.
    pub fn release(&mut self) {
        if self.reader.take().is_some() {
            debug!("Released process context (pid {})", self.info.pid);
        }
    }
}

impl<R: ReadMemory> ReadMemory for ProcessContext<R> {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let reader = self.reader.as_ref().ok_or(Error::ContextClosed)?;
        check_range(address, size)?;
        reader.read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        self.info.base_address
    }
}

impl<R: ReadMemory> Drop for ProcessContext<R> {
    fn drop(&mut self) {
        self.release();
    }
}

fn check_range(address: u64, size: usize) -> Result<()> {
    if address == 0 {
        return Err(Error::access_violation(address, size, "null address"));
    }
    if size > bounds::MAX_READ_SIZE {
        return Err(Error::access_violation(
            address,
            size,
            format!("read larger than {} bytes", bounds::MAX_READ_SIZE),
        ));
    }
    let end = address.checked_add(size as u64);
    if address < bounds::MIN_USER_ADDRESS || end.is_none_or(|end| end > bounds::MAX_USER_ADDRESS)
    {
        return Err(Error::access_violation(
            address,
            size,
            "address outside user space",
        ));
    }
    Ok(())
}

/// Produces a fresh context for each read cycle
pub trait ContextSource {
    type Reader: ReadMemory;

    fn acquire(&self) -> Result<ProcessContext<Self::Reader>>;
}

/// Context source backed by the live game process
#[derive(Debug, Clone, Default)]
pub struct ProcessSource {
    selector: ProcessSelector,
}

impl ProcessSource {
    pub fn new(selector: ProcessSelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &ProcessSelector {
        &self.selector
    }
}

impl ContextSource for ProcessSource {
    type Reader = MemoryReader;

    fn acquire(&self) -> Result<ProcessContext<MemoryReader>> {
        let process = ProcessHandle::open(&self.selector)?;
        let info = process.info();
        Ok(ProcessContext::new(MemoryReader::new(process), info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MockMemoryBuilder;

    fn context() -> ProcessContext<crate::memory::MockMemoryReader> {
        let reader = MockMemoryBuilder::new()
            .base(0x14000_0000)
            .write(0x20_0000, &[1, 2, 3, 4, 5, 6, 7, 8])
            .build();
        let info = reader.info();
        ProcessContext::new(reader, info)
    }

    #[test]
    fn test_read_through_open_context() {
        let ctx = context();
        assert!(ctx.is_open());
        assert_eq!(ctx.read_u32(0x20_0000).unwrap(), 0x0403_0201);
        assert_eq!(ctx.base_address(), 0x14000_0000);
    }

    #[test]
    fn test_released_context_rejects_reads() {
        let mut ctx = context();
        ctx.release();
        assert!(!ctx.is_open());
        assert!(matches!(
            ctx.read_u32(0x20_0000),
            Err(Error::ContextClosed)
        ));
        // Releasing twice is harmless
        ctx.release();
    }

    #[test]
    fn test_null_and_kernel_addresses_rejected() {
        let ctx = context();
        assert!(matches!(
            ctx.read_u64(0),
            Err(Error::AccessViolation { address: 0, .. })
        ));
        assert!(matches!(
            ctx.read_u64(0x8000),
            Err(Error::AccessViolation { .. })
        ));
        assert!(matches!(
            ctx.read_u64(0xFFFF_8000_0000_0000),
            Err(Error::AccessViolation { .. })
        ));
        assert!(matches!(
            ctx.read_u64(u64::MAX - 4),
            Err(Error::AccessViolation { .. })
        ));
    }

    #[test]
    fn test_oversized_read_rejected() {
        let ctx = context();
        let err = ctx
            .read_bytes(0x20_0000, bounds::MAX_READ_SIZE + 1)
            .unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unmapped_read_is_access_violation() {
        let ctx = context();
        assert!(matches!(
            ctx.read_u64(0x30_0000),
            Err(Error::AccessViolation { .. })
        ));
    }
}
