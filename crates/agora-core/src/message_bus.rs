//! Process-local message bus
//!
//! Fans messages out to every subscriber of a channel through tokio broadcast
//! channels. Cross-host deployments plug another [`MessageBus`] implementation
//! into the same contract.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::broadcast;

use agora_types::message_bus::{BusMessage, MessageBus};

use crate::prelude::*;

/// Configuration
#[derive(Clone, Debug)]
pub struct BusConfig {
	/// Maximum number of messages buffered per subscriber before it lags
	pub buffer_size: usize,
}

impl Default for BusConfig {
	fn default() -> Self {
		Self { buffer_size: 256 }
	}
}

pub struct LocalMessageBus {
	channels: parking_lot::Mutex<HashMap<Box<str>, broadcast::Sender<BusMessage>>>,
	config: BusConfig,
}

impl LocalMessageBus {
	pub fn new() -> Self {
		Self::with_config(BusConfig::default())
	}

	pub fn with_config(config: BusConfig) -> Self {
		Self { channels: parking_lot::Mutex::new(HashMap::new()), config }
	}

	/// Number of live subscribers of a channel
	pub fn subscriber_count(&self, channel: &str) -> usize {
		self.channels.lock().get(channel).map_or(0, broadcast::Sender::receiver_count)
	}
}

impl Default for LocalMessageBus {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl MessageBus for LocalMessageBus {
	async fn publish(&self, msg: BusMessage) -> ClResult<()> {
		let sender = self.channels.lock().get(msg.channel.as_ref()).cloned();
		match sender {
			Some(sender) => {
				// Sending only fails when nobody listens, which is not an error for pub/sub
				let delivered = sender.send(msg.clone()).unwrap_or(0);
				debug!(channel = %msg.channel, site_id = %msg.site_id, delivered, "Bus message published");
			}
			None => {
				debug!(channel = %msg.channel, site_id = %msg.site_id, "Bus message without subscribers");
			}
		}
		Ok(())
	}

	fn subscribe(&self, channel: &str) -> broadcast::Receiver<BusMessage> {
		let mut channels = self.channels.lock();
		channels
			.entry(channel.into())
			.or_insert_with(|| broadcast::channel(self.config.buffer_size).0)
			.subscribe()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use agora_types::message_bus::SITE_SETTINGS_CHANNEL;

	#[tokio::test]
	async fn test_publish_reaches_all_subscribers() {
		let bus = LocalMessageBus::new();
		let mut rx1 = bus.subscribe(SITE_SETTINGS_CHANNEL);
		let mut rx2 = bus.subscribe(SITE_SETTINGS_CHANNEL);
		assert_eq!(bus.subscriber_count(SITE_SETTINGS_CHANNEL), 2);

		let msg =
			BusMessage::new(SITE_SETTINGS_CHANNEL, SiteId(1), serde_json::json!({ "process": "p1" }));
		bus.publish(msg.clone()).await.unwrap();

		assert_eq!(rx1.recv().await.unwrap(), msg);
		assert_eq!(rx2.recv().await.unwrap(), msg);
	}

	#[tokio::test]
	async fn test_channels_are_isolated() {
		let bus = LocalMessageBus::new();
		let mut rx = bus.subscribe("/a");

		bus.publish(BusMessage::new("/b", SiteId(1), serde_json::json!({}))).await.unwrap();
		bus.publish(BusMessage::new("/a", SiteId(2), serde_json::json!({}))).await.unwrap();

		let received = rx.recv().await.unwrap();
		assert_eq!(received.site_id, SiteId(2));
		assert!(rx.try_recv().is_err());
	}

	#[tokio::test]
	async fn test_publish_without_subscribers() {
		let bus = LocalMessageBus::new();
		let res = bus.publish(BusMessage::new("/nobody", SiteId(1), serde_json::json!({}))).await;
		assert!(res.is_ok());
	}

	#[tokio::test]
	async fn test_lagging_subscriber() {
		let bus = LocalMessageBus::with_config(BusConfig { buffer_size: 2 });
		let mut rx = bus.subscribe("/a");
		for i in 0..5 {
			bus.publish(BusMessage::new("/a", SiteId(i), serde_json::json!({}))).await.unwrap();
		}
		assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(_))));
	}
}

// vim: ts=4
