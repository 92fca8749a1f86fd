//! Publish/subscribe through the engine's broker.

use crate::api::Engine;
use crate::error::Result;
use crate::pubsub::Subscription;

pub trait Queue {
    /// Delivers `message` to every current subscriber of `channel` and
    /// returns how many received it.
    fn publish(&self, channel: &str, message: &str) -> Result<i64>;

    /// Opens a subscription covering `channels`.
    fn subscribe(&self, channels: &[&str]) -> Result<Subscription>;
}

impl Queue for Engine {
    fn publish(&self, channel: &str, message: &str) -> Result<i64> {
        self.connector().ping()?;
        self.broker().publish(channel, message)
    }

    fn subscribe(&self, channels: &[&str]) -> Result<Subscription> {
        self.connector().ping()?;
        Ok(self.broker().subscribe(channels))
    }
}
