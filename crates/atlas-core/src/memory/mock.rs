//! In-memory stand-in for a foreign address space.
//!
//! Memory is mapped in 4KB pages on first write; reads touching an
//! unmapped page fail with `AccessViolation`, like a real process read.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::memory::{ContextSource, ProcessContext, ProcessInfo, ReadMemory};

const PAGE_SIZE: u64 = 0x1000;

#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    base: u64,
    image_size: u32,
    pages: Arc<BTreeMap<u64, Vec<u8>>>,
}

impl MockMemoryReader {
    pub fn info(&self) -> ProcessInfo {
        ProcessInfo {
            pid: 4242,
            base_address: self.base,
            image_size: self.image_size,
        }
    }

    /// Report a different module image size, as another game build would
    pub fn set_image_size(&mut self, image_size: u32) {
        self.image_size = image_size;
    }

    pub fn write(&mut self, address: u64, bytes: &[u8]) {
        let pages = Arc::make_mut(&mut self.pages);
        for (i, byte) in bytes.iter().enumerate() {
            let addr = address + i as u64;
            let page = pages
                .entry(addr / PAGE_SIZE)
                .or_insert_with(|| vec![0u8; PAGE_SIZE as usize]);
            page[(addr % PAGE_SIZE) as usize] = *byte;
        }
    }

    pub fn write_u16(&mut self, address: u64, value: u16) {
        self.write(address, &value.to_le_bytes());
    }

    pub fn write_u32(&mut self, address: u64, value: u32) {
        self.write(address, &value.to_le_bytes());
    }

    pub fn write_u64(&mut self, address: u64, value: u64) {
        self.write(address, &value.to_le_bytes());
    }

    /// Unmap the page containing `address`
    pub fn unmap(&mut self, address: u64) {
        Arc::make_mut(&mut self.pages).remove(&(address / PAGE_SIZE));
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(size);
        for i in 0..size as u64 {
            let addr = address
                .checked_add(i)
                .ok_or_else(|| Error::access_violation(address, size, "address overflow"))?;
            let page = self
                .pages
                .get(&(addr / PAGE_SIZE))
                .ok_or_else(|| Error::access_violation(address, size, "unmapped page"))?;
            out.push(page[(addr % PAGE_SIZE) as usize]);
        }
        Ok(out)
    }

    fn base_address(&self) -> u64 {
        self.base
    }
}

pub struct MockMemoryBuilder {
    reader: MockMemoryReader,
}

impl MockMemoryBuilder {
    pub fn new() -> Self {
        Self {
            reader: MockMemoryReader {
                base: 0x1_4000_0000,
                image_size: 0,
                pages: Arc::new(BTreeMap::new()),
            },
        }
    }

    pub fn base(mut self, base: u64) -> Self {
        self.reader.base = base;
        self
    }

    pub fn image_size(mut self, image_size: u32) -> Self {
        self.reader.image_size = image_size;
        self
    }

    pub fn write(mut self, address: u64, bytes: &[u8]) -> Self {
        self.reader.write(address, bytes);
        self
    }

    pub fn write_u32(mut self, address: u64, value: u32) -> Self {
        self.reader.write_u32(address, value);
        self
    }

    pub fn write_u64(mut self, address: u64, value: u64) -> Self {
        self.reader.write_u64(address, value);
        self
    }

    pub fn build(self) -> MockMemoryReader {
        self.reader
    }
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Context source handing out clones of a swappable mock reader.
///
/// `set(None)` simulates the game process going away.
pub struct MockSource {
    reader: Mutex<Option<MockMemoryReader>>,
    acquisitions: AtomicUsize,
    release_next: AtomicBool,
}

impl MockSource {
    pub fn new(reader: MockMemoryReader) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            acquisitions: AtomicUsize::new(0),
            release_next: AtomicBool::new(false),
        }
    }

    pub fn set(&self, reader: Option<MockMemoryReader>) {
        if let Ok(mut slot) = self.reader.lock() {
            *slot = reader;
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Hand out the next context already released
    pub fn release_next(&self) {
        self.release_next.store(true, Ordering::SeqCst);
    }
}

impl ContextSource for MockSource {
    type Reader = MockMemoryReader;

    fn acquire(&self) -> Result<ProcessContext<MockMemoryReader>> {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        let slot = self
            .reader
            .lock()
            .map_err(|_| Error::ProcessUnavailable("mock source poisoned".to_string()))?;
        match slot.as_ref() {
            Some(reader) => {
                let mut context = ProcessContext::new(reader.clone(), reader.info());
                if self.release_next.swap(false, Ordering::SeqCst) {
                    context.release();
                }
                Ok(context)
            }
            None => Err(Error::ProcessUnavailable("mock process exited".to_string())),
        }
    }
}
