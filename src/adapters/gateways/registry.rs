//! Static gateway registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::payment::PaymentGateway;
use crate::ports::{GatewayClient, GatewayRegistry};

/// Gateway clients keyed by code, fixed at startup.
#[derive(Default, Clone)]
pub struct StaticGatewayRegistry {
    clients: HashMap<String, Arc<dyn GatewayClient>>,
}

impl StaticGatewayRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client under its own code, replacing any previous one.
    pub fn register(&mut self, client: Arc<dyn GatewayClient>) {
        self.clients.insert(client.code().to_string(), client);
    }

    pub fn with(mut self, client: Arc<dyn GatewayClient>) -> Self {
        self.register(client);
        self
    }

    /// Drops clients whose gateway is missing, inactive or not recurrent.
    ///
    /// Returns the dropped codes, sorted.
    pub fn retain_recurrent(&mut self, gateways: &[PaymentGateway]) -> Vec<String> {
        let mut dropped: Vec<String> = self
            .clients
            .keys()
            .filter(|code| {
                !gateways
                    .iter()
                    .any(|g| &g.code == *code && g.can_charge_recurrently())
            })
            .cloned()
            .collect();
        dropped.sort();
        for code in &dropped {
            self.clients.remove(code);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

impl GatewayRegistry for StaticGatewayRegistry {
    fn get(&self, code: &str) -> Option<Arc<dyn GatewayClient>> {
        self.clients.get(code).cloned()
    }

    fn codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self.clients.keys().cloned().collect();
        codes.sort();
        codes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::gateways::MockGatewayClient;

    #[test]
    fn resolves_registered_clients_by_code() {
        let registry = StaticGatewayRegistry::new()
            .with(Arc::new(MockGatewayClient::new("tatrapay")))
            .with(Arc::new(MockGatewayClient::new("comfortpay")));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("comfortpay").unwrap().code(), "comfortpay");
        assert!(registry.get("paypal").is_none());
        assert_eq!(registry.codes(), vec!["comfortpay", "tatrapay"]);
    }

    #[test]
    fn register_replaces_client_with_same_code() {
        let mut registry = StaticGatewayRegistry::new();
        registry.register(Arc::new(MockGatewayClient::new("comfortpay")));
        registry.register(Arc::new(MockGatewayClient::full("comfortpay")));

        assert_eq!(registry.len(), 1);
        assert!(registry.get("comfortpay").unwrap().refunds().is_some());
    }

    fn gateway(code: &str, active: bool, is_recurrent: bool) -> PaymentGateway {
        PaymentGateway {
            code: code.to_string(),
            name: code.to_string(),
            active,
            visible: true,
            is_recurrent,
            sorting: 0,
        }
    }

    #[test]
    fn retain_recurrent_drops_unusable_gateways() {
        let mut registry = StaticGatewayRegistry::new()
            .with(Arc::new(MockGatewayClient::new("comfortpay")))
            .with(Arc::new(MockGatewayClient::new("tatrapay")))
            .with(Arc::new(MockGatewayClient::new("cardpay")))
            .with(Arc::new(MockGatewayClient::new("paypal")));

        let dropped = registry.retain_recurrent(&[
            gateway("comfortpay", true, true),
            gateway("tatrapay", true, false),
            gateway("cardpay", false, true),
        ]);

        assert_eq!(dropped, vec!["cardpay", "paypal", "tatrapay"]);
        assert_eq!(registry.codes(), vec!["comfortpay"]);
    }
}
