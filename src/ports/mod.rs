//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Gateway Ports
//!
//! - `GatewayClient` - Charge a stored token, plus optional capabilities
//!   (`TokenValidation`, `TokenExpiration`, `PreAuthorization`, `Refunds`)
//! - `GatewayRegistry` - Resolve gateway codes to clients
//!
//! ## Persistence Ports
//!
//! - `PaymentRepository` - Payments and their items
//! - `RecurrentPaymentRepository` - Recurrent payment chains, atomic transitions
//! - `SubscriptionTypeReader` - Product catalogue (read-only)
//! - `PaymentGatewayReader` - Gateway reference data (read-only)
//! - `PaymentLogRepository` - Append-only gateway audit log
//!
//! ## Scheduling
//!
//! - `NextChargeCalculator` - Next billing cycle date
//!
//! ## Event Ports
//!
//! - `EventPublisher` / `EventSubscriber` / `EventHandler`

mod event_publisher;
mod event_subscriber;
mod gateway_client;
mod gateway_registry;
mod next_charge_calculator;
mod payment_gateway_reader;
mod payment_log_repository;
mod payment_repository;
mod recurrent_payment_repository;
mod subscription_type_reader;

pub use event_publisher::EventPublisher;
pub use event_subscriber::{EventHandler, EventSubscriber};
pub use gateway_client::{
    ChargeOutcome, GatewayClient, GatewayError, GatewayErrorKind, GatewayResponse,
    PreAuthorization, RefundOutcome, Refunds, TokenExpiration, TokenValidation,
};
pub use gateway_registry::GatewayRegistry;
pub use next_charge_calculator::NextChargeCalculator;
pub use payment_gateway_reader::PaymentGatewayReader;
pub use payment_log_repository::{PaymentLogEntry, PaymentLogRepository, RECURRENT_CHARGE_LOG_SOURCE};
pub use payment_repository::PaymentRepository;
pub use recurrent_payment_repository::{RecurrentPaymentRepository, RecurrentTransition};
pub use subscription_type_reader::SubscriptionTypeReader;
