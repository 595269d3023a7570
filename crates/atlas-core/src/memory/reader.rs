use crate::error::{Error, Result};
use crate::memory::{Address, ProcessHandle};

/// Read access to a foreign address space.
///
/// Every read is fallible; implementors report unmapped or partially
/// copied ranges as [`Error::AccessViolation`].
pub trait ReadMemory {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>>;

    /// Base address of the main module
    fn base_address(&self) -> u64;

    fn read_u8(&self, address: u64) -> Result<u8> {
        let bytes = self.read_bytes(address, 1)?;
        Ok(bytes[0])
    }

    fn read_u16(&self, address: u64) -> Result<u16> {
        let bytes = self.read_array::<2>(address)?;
        Ok(u16::from_le_bytes(bytes))
    }

    fn read_u32(&self, address: u64) -> Result<u32> {
        let bytes = self.read_array::<4>(address)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn read_i32(&self, address: u64) -> Result<i32> {
        let bytes = self.read_array::<4>(address)?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn read_u64(&self, address: u64) -> Result<u64> {
        let bytes = self.read_array::<8>(address)?;
        Ok(u64::from_le_bytes(bytes))
    }

    fn read_ptr(&self, address: u64) -> Result<Address> {
        self.read_u64(address).map(Address::new)
    }

    fn read_array<const N: usize>(&self, address: u64) -> Result<[u8; N]> {
        let bytes = self.read_bytes(address, N)?;
        bytes
            .try_into()
            .map_err(|_| Error::access_violation(address, N, "short read"))
    }
}

impl<R: ReadMemory + ?Sized> ReadMemory for &R {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn base_address(&self) -> u64 {
        (**self).base_address()
    }
}

/// Reader over a live process
pub struct MemoryReader {
    process: ProcessHandle,
}

impl MemoryReader {
    pub fn new(process: ProcessHandle) -> Self {
        Self { process }
    }

    pub fn process(&self) -> &ProcessHandle {
        &self.process
    }
}

impl ReadMemory for MemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; size];
        self.process.read_into(address, &mut buffer)?;
        Ok(buffer)
    }

    fn base_address(&self) -> u64 {
        self.process.base_address
    }
}
