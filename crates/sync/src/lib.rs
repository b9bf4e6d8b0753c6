//! Live sync channel between the console and the monitoring server.
//!
//! The channel keeps one WebSocket connection to the server's push
//! endpoint, writes inbound monitor and group state through to the
//! [`LocalStore`](vigil_store::LocalStore), dispatches typed messages to
//! subscribers, and relays local group mutations back to the server.

pub mod bootstrap;
pub mod channel;
pub mod client;
pub mod config;
pub mod messages;
pub mod processor;
pub mod reconnect;
pub mod registry;
mod relay;

pub use bootstrap::{BootstrapTimeout, InitialData};
pub use channel::{ConnectionState, ConnectionStatus, SyncChannel};
pub use client::TransportError;
pub use config::ChannelConfig;
pub use messages::{ChannelMessage, MessageKind};
pub use reconnect::{Backoff, ReconnectConfig};
pub use registry::Subscription;
