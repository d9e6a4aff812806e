//! Session implementations that are not tied to a network driver.
//!
//! The PostgreSQL session lives with its driver in
//! [`crate::drivers::postgres`].

mod memory;

pub use memory::{MemoryDatabase, MemorySession, MemorySessionFactory};
