// ===========================================
// Imports
// ===========================================
use std::time::Instant;

use log::error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::metrics;
use crate::proxy::{Player, Shared, STATE_LOGIN};
use crate::stream::Stream;

// ===========================================
// Upstream Hand-off
// ===========================================

/// Dials the player's forward target, replays the captured handshake as the
/// upstream's first bytes, then splices the two sockets together until
/// either side closes.
pub(crate) async fn forward_connection(player: Player, stream: Stream<TcpStream>, shared: &Shared) {
    let (Some(address), Some(initial_packet)) = (player.forward_address, player.initial_packet)
    else {
        return;
    };

    let mut upstream = match TcpStream::connect(&address).await {
        Ok(conn) => Stream::new(conn),
        Err(err) => {
            metrics::record_upstream_failure();
            error!("failed to connect to upstream {}: {}", address, err);
            return;
        }
    };

    // Lifecycle callbacks fire for login forwards only, never for
    // server-list pings.
    let started = Instant::now();
    let mut notify_disconnect = None;
    if player.state == STATE_LOGIN {
        if let Some(callback) = &shared.on_forward_connect {
            let callback = callback.clone();
            let connect_address = address.clone();
            tokio::spawn(async move { callback(&connect_address) });
            notify_disconnect = shared.on_forward_disconnect.clone();
        }
    }

    // The handshake was already consumed from the client; the upstream must
    // still see a protocol-compliant framed copy before anything else.
    if let Err(err) = upstream.write_packet(&initial_packet).await {
        error!("failed to replay handshake to {}: {}", address, err);
    } else {
        metrics::record_forward_opened();

        let (mut client_read, mut client_write) = stream.into_inner().into_split();
        let (mut upstream_read, mut upstream_write) = upstream.into_inner().into_split();

        tokio::select! {
            _ = pipe(&mut client_read, &mut upstream_write, "client->upstream") => {}
            _ = pipe(&mut upstream_read, &mut client_write, "upstream->client") => {}
        }
        // Either direction finishing tears the whole session down; dropping
        // the halves closes both sockets.

        metrics::record_forward_closed();
    }

    if let Some(callback) = notify_disconnect {
        let elapsed = started.elapsed();
        tokio::spawn(async move { callback(&address, elapsed) });
    }
}

// ===========================================
// Byte Pipe
// ===========================================

/// Copies bytes from `from` to `to` until EOF or an error, then shuts the
/// write side down.
async fn pipe<R, W>(from: &mut R, to: &mut W, direction: &'static str)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = [0u8; 2048];
    loop {
        match from.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                metrics::record_bytes(direction, n);
                if let Err(err) = to.write_all(&buf[..n]).await {
                    error!("{} - write error: {}", direction, err);
                    break;
                }
            }
            Err(err) => {
                error!("{} - read error: {}", direction, err);
                break;
            }
        }
    }
    let _ = to.shutdown().await;
}
