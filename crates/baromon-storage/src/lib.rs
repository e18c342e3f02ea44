//! Durable notification memory.
//!
//! [`memory::MemoryStore`] keeps one `last_sent_at` per alert key in a
//! small SQLite database. Every read-decide-write sequence runs inside an
//! IMMEDIATE transaction so two overlapping invocations cannot both pass
//! the cooldown check.

pub mod error;
pub mod memory;


pub use error::{Result, StorageError};
pub use memory::{MemoryStore, PRESSURE_DROP_KEY};
