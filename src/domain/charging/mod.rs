//! Recurring charge rules shared by the charge handlers.
//!
//! - `amount_splitter` - ChargeAmountSplitter (custom amount over VAT lines)
//! - `settings` - ChargingSettings snapshot for one run
//! - `errors` - ChargeError

mod amount_splitter;
mod errors;
mod settings;

pub use amount_splitter::ChargeAmountSplitter;
pub use errors::ChargeError;
pub use settings::ChargingSettings;
