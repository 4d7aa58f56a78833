//! Application layer - Command handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! The charge run is the scheduled entry point; the other handlers serve
//! operator actions.

pub mod handlers;

pub use handlers::{
    ChargeRecurrentPaymentsCommand, ChargeRecurrentPaymentsHandler, ChargeRunSummary,
    CheckTokenExpirationCommand, CheckTokenExpirationHandler, ReactivateRecurrentPaymentCommand,
    ReactivateRecurrentPaymentHandler, RefundPaymentCommand, RefundPaymentHandler, StopActor,
    StopRecurrentPaymentCommand, StopRecurrentPaymentHandler,
};
