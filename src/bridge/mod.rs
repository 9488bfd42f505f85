//! Message bridge to the privileged backend process.
//!
//! Two kinds of traffic go over it: request/response calls (`invoke`) and
//! one-way notifications (`send`). Everything above this module depends on
//! the [`MessageBridge`] trait only.

pub mod socket;

use async_trait::async_trait;
use serde_json::Value;

pub use socket::SocketBridge;

#[async_trait]
pub trait MessageBridge: Send + Sync {
    /// Call `method` on the backend and wait for its reply.
    async fn invoke(&self, method: &str, args: Value) -> anyhow::Result<Value>;

    /// Post `payload` on `channel`. Delivery is not acknowledged.
    async fn send(&self, channel: &str, payload: Value) -> anyhow::Result<()>;
}
