//! Session context: one connection and one pricing snapshot.
//!
//! A `Session` is built once per deployment attempt and passed explicitly
//! to every component. It owns the transport and closes it when dropped,
//! so the connection is released on every exit path, early failures
//! included. Pricing is read exactly once, at open, and never reused
//! across sessions.

use tracing::{debug, info};

use deploykit_primitives::ClusterPricing;
use deploykit_transport::ChainTransport;

use crate::error::{DeployError, DeployResult, DeployStage};

pub struct Session {
    transport: Box<dyn ChainTransport>,
    pricing: ClusterPricing,
}

impl Session {
    /// Take ownership of `transport` and read the cluster pricing.
    ///
    /// The transport is closed if the pricing read fails.
    pub async fn open<T: ChainTransport + 'static>(transport: T) -> DeployResult<Self> {
        let transport: Box<dyn ChainTransport> = Box::new(transport);
        let pricing = match transport.cluster_pricing().await {
            Ok(pricing) => pricing,
            Err(e) => {
                transport.close();
                return Err(DeployError::new(DeployStage::Session, e));
            }
        };
        info!(
            endpoint = transport.endpoint(),
            gas_price = %pricing.gas_price,
            deposit_per_byte = %pricing.deposit_per_byte,
            deposit_per_item = %pricing.deposit_per_item,
            "session opened"
        );
        Ok(Self { transport, pricing })
    }

    pub fn transport(&self) -> &dyn ChainTransport {
        self.transport.as_ref()
    }

    /// Pricing snapshot taken when the session was opened.
    pub fn pricing(&self) -> &ClusterPricing {
        &self.pricing
    }

    /// Close the session now rather than at end of scope.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        debug!(endpoint = self.transport.endpoint(), "closing session");
        self.transport.close();
    }
}
