mod address;
mod context;
pub mod layout;
mod process;
mod reader;

// Mock memory reader for unit tests and, with `test-support`, integration tests
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod mock;

pub use address::Address;
pub use context::{ContextSource, ProcessContext, ProcessSource};
pub use process::*;
pub use reader::{MemoryReader, ReadMemory};

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub use mock::{MockMemoryBuilder, MockMemoryReader, MockSource};
