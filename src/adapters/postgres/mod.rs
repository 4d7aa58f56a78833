//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresPaymentRepository` - Payments with their items
//! - `PostgresRecurrentPaymentRepository` - Recurrent rows; transitions run in one transaction
//! - `PostgresSubscriptionTypeReader` - Product catalogue
//! - `PostgresPaymentLogRepository` - Gateway audit log
//! - `PostgresPaymentGatewayReader` - Gateway reference data

mod payment_gateway_reader;
mod payment_log_repository;
mod payment_repository;
mod recurrent_payment_repository;
mod subscription_type_reader;

pub use payment_gateway_reader::PostgresPaymentGatewayReader;
pub use payment_log_repository::PostgresPaymentLogRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use recurrent_payment_repository::PostgresRecurrentPaymentRepository;
pub use subscription_type_reader::PostgresSubscriptionTypeReader;
