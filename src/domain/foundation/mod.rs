//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps, money helpers, the state machine
//! contract, event infrastructure and error types that form the
//! vocabulary of the payments domain.

mod errors;
mod events;
mod ids;
pub mod money;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use events::{
    DomainEvent, EventEnvelope, EventId, EventMetadata, SerializableDomainEvent,
};
pub use ids::{
    PaymentId, PaymentLogId, PaymentToken, RecurrentPaymentId, SubscriptionId,
    SubscriptionTypeId, UserId,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
