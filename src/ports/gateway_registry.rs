//! Gateway registry port - resolves gateway codes to clients.

use std::sync::Arc;

use super::GatewayClient;

/// Lookup of gateway clients by code.
pub trait GatewayRegistry: Send + Sync {
    /// Returns the client registered for `code`.
    fn get(&self, code: &str) -> Option<Arc<dyn GatewayClient>>;

    /// Codes of all registered clients.
    fn codes(&self) -> Vec<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_registry_is_object_safe() {
        fn _accepts_dyn(_registry: &dyn GatewayRegistry) {}
    }
}
