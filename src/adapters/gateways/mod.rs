//! Gateway adapters.

mod mock_gateway;
mod registry;

pub use mock_gateway::{GatewayCall, MockGatewayClient};
pub use registry::StaticGatewayRegistry;
