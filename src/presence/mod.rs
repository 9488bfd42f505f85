//! "Now playing" status for the presence channel (Discord rich presence).
//!
//! The backend owns the actual RPC connection; we only post the strings.

use crate::bridge::MessageBridge;
use crate::metadata::Metadata;
use serde::Serialize;

pub const RPC_CHANNEL: &str = "set-rpc-state";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiscordState {
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<bool>,
}

impl DiscordState {
    pub fn idle() -> Self {
        Self {
            details: "Idle...".to_string(),
            state: None,
            timestamp: Some(true),
        }
    }

    pub fn now_playing(metadata: &Metadata) -> Self {
        Self {
            details: format!("{} → {}", metadata.title(), metadata.album()),
            state: Some(format!("by {}", metadata.artist())),
            timestamp: None,
        }
    }
}

pub async fn update_discord_state(bridge: &dyn MessageBridge, metadata: Option<&Metadata>) {
    let Some(metadata) = metadata else {
        return;
    };
    post(bridge, &DiscordState::now_playing(metadata)).await;
}

pub async fn reset_discord_state(bridge: &dyn MessageBridge) {
    post(bridge, &DiscordState::idle()).await;
}

async fn post(bridge: &dyn MessageBridge, state: &DiscordState) {
    let payload = match serde_json::to_value(state) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!("encode presence: {e}");
            return;
        }
    };
    if let Err(e) = bridge.send(RPC_CHANNEL, payload).await {
        tracing::debug!("presence update dropped: {e:#}");
    }
}
