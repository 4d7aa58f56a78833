//! Event bus adapters.
//!
//! - `InMemoryEventBus` - Synchronous in-process delivery with capture
//! - `LoggingEventHandler` - Writes delivered events to the log

mod in_memory;
mod logging_handler;

pub use in_memory::InMemoryEventBus;
pub use logging_handler::LoggingEventHandler;
