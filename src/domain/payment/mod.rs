//! Payment domain module.
//!
//! # Module Structure
//!
//! - `aggregate` - Payment aggregate entity
//! - `status` - PaymentStatus state machine
//! - `item` - PaymentItem lines and their container
//! - `gateway` - PaymentGateway reference data
//! - `errors` - PaymentError
//! - `events` - Payment domain events

mod aggregate;
mod errors;
mod events;
mod gateway;
mod item;
mod status;

pub use aggregate::{generate_variable_symbol, AdditionalType, NewPayment, Payment};
pub use errors::PaymentError;
pub use events::PaymentRefunded;
pub use gateway::PaymentGateway;
pub use item::{PaymentItem, PaymentItemContainer, PaymentItemType};
pub use status::PaymentStatus;
