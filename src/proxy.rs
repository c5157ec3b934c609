// ===========================================
// Imports
// ===========================================
use std::io;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::error::Result;
use crate::forwarding;
use crate::metrics;
use crate::packet::Packet;
use crate::ping::{
    display_message, handle_ping_packet, read_handshake_packet, write_handshake_response,
};
use crate::router::Router;
use crate::stream::{PacketStream, Stream};

// Protocol sub-state after the handshake: 1 covers the handshake and status
// flow, 2 is login.
pub(crate) const STATE_STATUS: i32 = 1;
pub(crate) const STATE_LOGIN: i32 = 2;

// Sentinel id a client sends when it wishes to quit outright.
const PACKET_ID_QUIT: i32 = 0x7A;

const REJECTION_MESSAGE: &str = "Connection rejected. There is no server on this hostname.";

// ===========================================
// Player
// ===========================================

/// Per-connection record, created on accept and owned by the connection's
/// task until the socket closes or the session is handed to the forwarder.
pub struct Player {
    pub ip_address: String,
    pub username: String,
    /// The virtual hostname from the handshake, lowercased.
    pub hostname: String,
    pub should_close: bool,
    pub forward_address: Option<String>,
    /// The client's handshake re-serialized with its id prefix but no outer
    /// length, ready to be replayed to an upstream.
    pub(crate) initial_packet: Option<Packet>,
    pub(crate) state: i32,
}

impl Player {
    pub(crate) fn new(ip_address: String) -> Self {
        Self {
            ip_address,
            username: String::new(),
            hostname: String::new(),
            should_close: false,
            forward_address: None,
            initial_packet: None,
            state: STATE_STATUS,
        }
    }
}

// ===========================================
// Proxy & Listener
// ===========================================

pub type ForwardConnect = Arc<dyn Fn(&str) + Send + Sync>;
pub type ForwardDisconnect = Arc<dyn Fn(&str, Duration) + Send + Sync>;

/// Everything a connection task needs: the routing table and the forward
/// lifecycle callbacks.
pub(crate) struct Shared {
    pub(crate) router: Arc<Router>,
    pub(crate) on_forward_connect: Option<ForwardConnect>,
    pub(crate) on_forward_disconnect: Option<ForwardDisconnect>,
}

/// The front door: accepts connections and runs one handler task per
/// socket against a shared [`Router`].
#[derive(Clone)]
pub struct Proxy {
    router: Arc<Router>,
    on_forward_connect: Option<ForwardConnect>,
    on_forward_disconnect: Option<ForwardDisconnect>,
    shutdown: Arc<Notify>,
}

impl Proxy {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            on_forward_connect: None,
            on_forward_disconnect: None,
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Called whenever a login connection is forwarded to an upstream
    /// address. Server-list pings never trigger it.
    pub fn on_forward_connect<F>(&mut self, callback: F)
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_forward_connect = Some(Arc::new(callback));
    }

    /// Called when a forwarded login connection closes, with how long it
    /// was up. Only fires when an `on_forward_connect` callback is set.
    pub fn on_forward_disconnect<F>(&mut self, callback: F)
    where
        F: Fn(&str, Duration) + Send + Sync + 'static,
    {
        self.on_forward_disconnect = Some(Arc::new(callback));
    }

    /// Releases the accept loop. Connections already in flight keep running
    /// until their sockets close.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// Binds the given port on all interfaces and serves until [`stop`] is
    /// called. The bind failure is the only error returned.
    ///
    /// [`stop`]: Proxy::stop
    pub async fn listen(&self, port: u16) -> io::Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        self.serve(listener).await
    }

    /// Serves connections from an already-bound listener.
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        if let Ok(addr) = listener.local_addr() {
            info!("listening on {}", addr);
        }

        let shared = Arc::new(Shared {
            router: self.router.clone(),
            on_forward_connect: self.on_forward_connect.clone(),
            on_forward_disconnect: self.on_forward_disconnect.clone(),
        });

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => return Ok(()),
                accepted = listener.accept() => match accepted {
                    Ok((socket, _)) => {
                        if let Err(err) = socket.set_nodelay(true) {
                            warn!("failed to disable Nagle: {}", err);
                        }
                        tokio::spawn(handle_connection(shared.clone(), socket));
                    }
                    Err(err) => error!("accept error: {}", err),
                }
            }
        }
    }
}

// ===========================================
// Connection Handling & Packet Loop
// ===========================================

async fn handle_connection(shared: Arc<Shared>, socket: TcpStream) {
    let ip_address = match socket.peer_addr() {
        Ok(addr) => addr.ip().to_string(),
        Err(err) => {
            warn!("failed to resolve peer address: {}", err);
            return;
        }
    };
    metrics::record_connection_accepted();

    let mut player = Player::new(ip_address);
    let mut stream = Stream::new(socket);

    loop {
        if player.should_close {
            return;
        }

        let mut packet = match stream.packet_stream().await {
            Ok(packet) => packet,
            Err(err) if err.is_eof() => return,
            Err(err) => {
                warn!(
                    "failed to read next packet from {}: {}",
                    player.ip_address, err
                );
                return;
            }
        };

        let packet_id = match packet.read_var_int().await {
            Ok(id) => id,
            Err(err) => {
                warn!(
                    "failed to read packet id from {}: {}",
                    player.ip_address, err
                );
                return;
            }
        };

        match packet_id {
            0x00 => {
                if let Err(err) = handle_request(&shared.router, &mut player, &mut packet).await {
                    warn!("failed to handle packet 0x00: {}", err);
                }
                if player.forward_address.is_some() {
                    // The handshake was fully consumed; hand the session
                    // over to the forwarder.
                    break;
                }
            }
            0x01 => {
                if let Err(err) = handle_ping(&shared.router, &player, &mut packet).await {
                    warn!("failed to handle packet 0x01: {}", err);
                }
            }
            PACKET_ID_QUIT => return,
            other => warn!("unknown packet id {} from {}", other, player.ip_address),
        }

        match packet.exhaust_packet().await {
            Ok(0) => {}
            Ok(drained) => warn!(
                "drained {} unread bytes after packet id {}",
                drained, packet_id
            ),
            Err(err) => warn!("failed to drain packet id {}: {}", packet_id, err),
        }
    }

    forwarding::forward_connection(player, stream, &shared).await;
}

/// Packet id 0x00 is three different things depending on state and body:
/// the handshake, the empty status request, or login start.
async fn handle_request(
    router: &Router,
    player: &mut Player,
    packet: &mut PacketStream<'_, TcpStream>,
) -> Result<()> {
    if packet.remaining() == 0 {
        if player.state != STATE_STATUS {
            return Ok(());
        }

        metrics::record_status_request();
        return match router.status(&player.hostname) {
            None => {
                player.should_close = true;
                Ok(())
            }
            Some(status) => write_handshake_response(packet.stream_mut(), &status).await,
        };
    }

    match player.state {
        STATE_STATUS => {
            let handshake = read_handshake_packet(packet).await?;
            player.hostname = handshake.server_address.to_ascii_lowercase();

            if let Some(address) = router.forward_target(&player.hostname) {
                let mut initial = Packet::with_id(0x00);
                initial.write_var_int(handshake.protocol_version);
                initial.write_string(&handshake.server_address);
                initial.write_uint16(handshake.server_port);
                initial.write_var_int(handshake.next_state);
                player.initial_packet = Some(initial);
                player.forward_address = Some(address);
                player.state = handshake.next_state;
                return Ok(());
            }

            if handshake.next_state == STATE_STATUS || handshake.next_state == STATE_LOGIN {
                player.state = handshake.next_state;
            }
            Ok(())
        }
        STATE_LOGIN => {
            player.username = packet.read_string().await?;
            metrics::record_login_attempt();

            match router.handler(&player.hostname) {
                None => {
                    warn!("missing handler for hostname {}", player.hostname);
                    display_message(packet.stream_mut(), REJECTION_MESSAGE).await
                }
                Some(handler) => {
                    let message = handler.login_message(player);
                    display_message(packet.stream_mut(), &message).await
                }
            }
        }
        _ => Ok(()),
    }
}

async fn handle_ping(
    router: &Router,
    player: &Player,
    packet: &mut PacketStream<'_, TcpStream>,
) -> Result<()> {
    if packet.remaining() == 0 {
        return Ok(());
    }

    metrics::record_ping_request();
    // Unknown hostnames ping against a hidden default, which swallows the
    // nonce without replying.
    let status = router.status(&player.hostname).unwrap_or_default();
    handle_ping_packet(packet, &status).await
}
