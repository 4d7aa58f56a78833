//! Recurrent payment handlers.
//!
//! ## Charge run
//! - `ChargeRecurrentPaymentsHandler` - selects due rows and charges them
//! - `RecurrentPaymentsResolver` - billed subscription type and amount
//! - `ChargePaymentBuilder` - payment and items for one attempt
//! - `RecurrentPaymentsProcessor` - applies a gateway outcome
//!
//! ## Commands
//! - Stopping a recurrent payment (user or admin)
//! - Reactivating a stopped recurrent payment
//! - Refreshing token expiration dates

mod charge_payment_builder;
mod charge_recurrent_payments;
mod check_token_expiration;
mod process_charge_outcome;
mod reactivate_recurrent_payment;
mod resolve_charge;
mod stop_recurrent_payment;

// Charge run
pub use charge_payment_builder::{ChargePaymentBuilder, RECURRENT_DONATION_ITEM_NAME};
pub use charge_recurrent_payments::{
    ChargeRecurrentPaymentsCommand, ChargeRecurrentPaymentsHandler, ChargeRunSummary,
    INVALID_TOKEN_RESULT_CODE,
};
pub use process_charge_outcome::{
    ChargeDisposition, ProcessChargeOutcomeCommand, ProcessChargeOutcomeResult,
    RecurrentPaymentsProcessor,
};
pub use resolve_charge::{RecurrentPaymentsResolver, ResolvedCharge};

// Commands
pub use check_token_expiration::{
    CheckTokenExpirationCommand, CheckTokenExpirationHandler, CheckTokenExpirationResult,
};
pub use reactivate_recurrent_payment::{
    ReactivateRecurrentPaymentCommand, ReactivateRecurrentPaymentHandler,
};
pub use stop_recurrent_payment::{StopActor, StopRecurrentPaymentCommand, StopRecurrentPaymentHandler};
