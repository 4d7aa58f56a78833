//! Adapters - Implementations of port interfaces.
//!
//! - `events` - In-process event bus and logging handler
//! - `gateways` - Gateway registry and the mock gateway client
//! - `memory` - In-memory repositories for tests and dry runs
//! - `postgres` - PostgreSQL repositories
//! - `schedule` - Next charge date calculation

pub mod events;
pub mod gateways;
pub mod memory;
pub mod postgres;
pub mod schedule;

pub use events::{InMemoryEventBus, LoggingEventHandler};
pub use gateways::{MockGatewayClient, StaticGatewayRegistry};
pub use memory::{InMemoryPaymentLog, InMemoryPaymentStore, InMemorySubscriptionTypeReader};
pub use schedule::SubscriptionLengthCalculator;
