//! rim-store - Credential stores for the RIM client.
//!
//! [`MemoryTokenStore`] keeps the pair in process memory (tests, short-lived
//! tools). [`FileTokenStore`] persists it as JSON so sessions survive
//! restarts.

mod file;
mod memory;

pub use file::FileTokenStore;
pub use memory::MemoryTokenStore;
