//! Pub/sub contract used for cross-process cache invalidation.
//!
//! Delivery is at-least-once and handlers must be idempotent. A message is
//! always scoped to one site.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::prelude::*;

pub const SITE_SETTINGS_CHANNEL: &str = "/site_settings";
pub const CLIENT_SETTINGS_CHANNEL: &str = "/client_settings";
pub const CATEGORIES_CHANNEL: &str = "/categories";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusMessage {
	pub channel: Box<str>,
	pub site_id: SiteId,
	pub data: serde_json::Value,
}

impl BusMessage {
	pub fn new(channel: &str, site_id: SiteId, data: serde_json::Value) -> Self {
		Self { channel: channel.into(), site_id, data }
	}
}

#[async_trait]
pub trait MessageBus: Send + Sync {
	async fn publish(&self, msg: BusMessage) -> ClResult<()>;

	/// Subscribe to every message published on `channel` from now on
	fn subscribe(&self, channel: &str) -> broadcast::Receiver<BusMessage>;
}

// vim: ts=4
