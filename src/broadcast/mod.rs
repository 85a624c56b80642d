//! Broadcast engine for live push channels.
//!
//! A broadcast reads a topic's registry, delivers the payload to every
//! channel at once, and waits for all deliveries:
//! - delivered: nothing to do
//! - channel gone: the registry entry is pruned and the broadcast carries on
//! - anything else: reported to the caller after all deliveries settle
//!
//! # Example
//!
//! ```ignore
//! let broadcaster = Broadcaster::new(registry, transport);
//! let report = broadcaster.broadcast(Topic::Posts, &post).await?;
//! println!("delivered to {} channels, pruned {}", report.delivered, report.pruned.len());
//! ```

mod engine;
mod transport;

pub use engine::{BroadcastReport, Broadcaster};
pub use transport::{DeliveryError, Transport};
