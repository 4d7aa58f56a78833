//! Domain layer - payment model, recurring charge rules and shared primitives.

pub mod charging;
pub mod foundation;
pub mod payment;
pub mod recurrent;
pub mod subscription;
