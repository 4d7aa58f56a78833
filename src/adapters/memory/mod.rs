//! In-memory persistence adapters.
//!
//! Used by tests and by the binary's dry-run mode.

mod catalogue;
mod payment_log;
mod payment_store;

pub use catalogue::InMemorySubscriptionTypeReader;
pub use payment_log::InMemoryPaymentLog;
pub use payment_store::InMemoryPaymentStore;
