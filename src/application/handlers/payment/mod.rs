//! Payment handlers.
//!
//! ## Commands
//! - Refunding a settled payment

mod refund_payment;

pub use refund_payment::{
    RefundPaymentCommand, RefundPaymentHandler, RefundPaymentResult, REFUND_LOG_SOURCE,
};
