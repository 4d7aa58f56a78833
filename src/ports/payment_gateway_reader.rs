//! Payment gateway reader port (gateway reference data).

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::payment::PaymentGateway;

#[async_trait]
pub trait PaymentGatewayReader: Send + Sync {
    /// All configured gateways, ordered by `sorting`.
    async fn find_all(&self) -> Result<Vec<PaymentGateway>, DomainError>;
}
