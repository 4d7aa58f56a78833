//! Application handlers.
//!
//! Command handlers that orchestrate domain operations through ports.

pub mod payment;
pub mod recurrent;

pub use payment::{RefundPaymentCommand, RefundPaymentHandler, RefundPaymentResult};
pub use recurrent::{
    // Charge run
    ChargeDisposition, ChargePaymentBuilder, ChargeRecurrentPaymentsCommand,
    ChargeRecurrentPaymentsHandler, ChargeRunSummary, ProcessChargeOutcomeCommand,
    ProcessChargeOutcomeResult, RecurrentPaymentsProcessor, RecurrentPaymentsResolver,
    ResolvedCharge,
    // Operator commands
    CheckTokenExpirationCommand, CheckTokenExpirationHandler, CheckTokenExpirationResult,
    ReactivateRecurrentPaymentCommand, ReactivateRecurrentPaymentHandler, StopActor,
    StopRecurrentPaymentCommand, StopRecurrentPaymentHandler,
};
