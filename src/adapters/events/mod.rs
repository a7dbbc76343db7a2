//! Event bus adapters.
//!
//! Adapters implement the event publishing port for different environments:
//!
//! - `InMemoryEventBus` - Synchronous, in-process bus for tests and
//!   single-process deployments

mod in_memory;

pub use in_memory::InMemoryEventBus;
