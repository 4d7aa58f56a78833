//! Recurrent payment domain module.
//!
//! # Module Structure
//!
//! - `aggregate` - RecurrentPayment row (one scheduled charge attempt)
//! - `state` - RecurrentPaymentState state machine
//! - `events` - Events emitted on every state change

mod aggregate;
mod events;
mod state;

pub use aggregate::{NewRecurrentPayment, RecurrentPayment, NO_CHARGE_RETRIES};
pub use events::{
    RecurrentPaymentChargeFailed, RecurrentPaymentCharged, RecurrentPaymentExpirationUpdated,
    RecurrentPaymentPending, RecurrentPaymentReactivated, RecurrentPaymentScheduled,
    RecurrentPaymentStopped,
};
pub use state::RecurrentPaymentState;
