//! Scheduling adapters.

mod subscription_length;

pub use subscription_length::SubscriptionLengthCalculator;
