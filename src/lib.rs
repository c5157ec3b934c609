//! Hostname-aware front door for the Minecraft Java Edition protocol.
//!
//! Accepts client connections, drives the unencrypted
//! handshake/status/login prelude, and either answers locally (server-list
//! status, ping echo, disconnect message) or splices the session onto an
//! upstream server chosen by the hostname the client dialled.
//!
//! ```no_run
//! use beacon::{Player, Proxy, Router, Status};
//!
//! # async fn run() -> std::io::Result<()> {
//! let router = Router::new();
//! router.set_status(
//!     &["play.example.com"],
//!     Status {
//!         max_players: 100,
//!         message: "§6Welcome".into(),
//!         show_connection: true,
//!         protocol_number: 47,
//!         ..Default::default()
//!     },
//! );
//! router.forward(&["play.example.com"], "10.0.0.2:25565");
//! router.handle(&["queue.example.com"], |player: &Player| {
//!     format!("Hold tight, {}.", player.username)
//! });
//!
//! Proxy::new(router).listen(25565).await
//! # }
//! ```

pub mod chat;
pub mod config_loader;
pub mod error;
pub mod logger;
pub mod metrics;
pub mod packet;
pub mod ping;
pub mod proxy;
pub mod router;
pub mod stream;

mod forwarding;

pub use error::{Error, Result};
pub use packet::Packet;
pub use ping::{HandshakePacket, Status};
pub use proxy::{Player, Proxy};
pub use router::{Handler, Router};
pub use stream::{PacketStream, Stream};
