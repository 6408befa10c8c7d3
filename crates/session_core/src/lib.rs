mod controller;
pub mod token_slot;

pub use controller::{SessionController, SessionError, SessionPhase, SessionSnapshot};
pub use identity::{IdentityProvider, IdentityStore, Latency};
pub use token_slot::{MemoryTokenSlot, StorageTokenSlot, TokenSlot, SESSION_TOKEN_KEY};

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
