//! Reading and answering the handshake, server-list status and login
//! disconnect packets of the unencrypted protocol prelude.

use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::Result;
use crate::packet::Packet;
use crate::stream::{PacketStream, Stream};

/// Brand shown in the server-list version line.
const SERVER_BRAND: &str = "1lann/beacon";

/// Release labels by protocol number; a status response advertises the
/// smallest release that still covers the configured protocol.
const RELEASES: [(i32, &str); 4] = [(4, "1.7.5"), (5, "1.7.10"), (47, "1.8.9"), (107, "1.9")];

/// The decoded first packet of a connection: protocol version, the virtual
/// hostname the client dialled, the port, and the requested next state
/// (1 = status, 2 = login).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandshakePacket {
    pub protocol_version: i32,
    pub server_address: String,
    pub server_port: u16,
    pub next_state: i32,
}

/// What to show on the requesting player's server-list menu.
#[derive(Clone, Debug, Default)]
pub struct Status {
    pub online_players: i32,
    pub max_players: i32,
    pub message: String,
    pub show_connection: bool,
    pub protocol_number: i32,
}

#[derive(Serialize)]
struct StatusResponse {
    version: Version,
    players: Players,
    description: String,
}

#[derive(Serialize)]
struct Version {
    name: String,
    protocol: i32,
}

#[derive(Serialize)]
struct Players {
    max: i32,
    online: i32,
}

fn version_label(protocol_number: i32) -> &'static str {
    RELEASES
        .iter()
        .find(|(protocol, _)| *protocol >= protocol_number)
        .map(|(_, label)| *label)
        .unwrap_or("future")
}

/// Reads the four handshake fields in wire order. Any read error
/// short-circuits and is reported by the caller.
pub async fn read_handshake_packet<C>(packet: &mut PacketStream<'_, C>) -> Result<HandshakePacket>
where
    C: AsyncRead + Unpin,
{
    Ok(HandshakePacket {
        protocol_version: packet.read_var_int().await?,
        server_address: packet.read_string().await?,
        server_port: packet.read_uint16().await?,
        next_state: packet.read_var_int().await?,
    })
}

/// Answers a status request with the JSON document the client renders in
/// its multiplayer menu.
pub async fn write_handshake_response<C>(stream: &mut Stream<C>, status: &Status) -> Result<()>
where
    C: AsyncWrite + Unpin,
{
    let response = StatusResponse {
        version: Version {
            name: format!(
                "{} {}",
                SERVER_BRAND,
                version_label(status.protocol_number)
            ),
            protocol: status.protocol_number,
        },
        players: Players {
            max: status.max_players,
            online: status.online_players,
        },
        description: status.message.clone(),
    };

    let mut packet = Packet::with_id(0x00);
    packet.write_string(&serde_json::to_string(&response)?);
    stream.write_packet(&packet).await
}

/// Reads the ping nonce and echoes it back, unless the status hides the
/// connection, in which case the nonce is read and dropped without a reply.
pub async fn handle_ping_packet<C>(packet: &mut PacketStream<'_, C>, status: &Status) -> Result<()>
where
    C: AsyncRead + AsyncWrite + Unpin,
{
    let nonce = packet.read_int64().await?;
    if !status.show_connection {
        return Ok(());
    }

    let mut pong = Packet::with_id(0x01);
    pong.write_int64(nonce);
    packet.write_packet(&pong).await
}

/// Sends a login-disconnect whose only field is the JSON-encoded message
/// string, shown to the player as the reason they were turned away.
pub async fn display_message<C>(stream: &mut Stream<C>, message: &str) -> Result<()>
where
    C: AsyncWrite + Unpin,
{
    let mut packet = Packet::with_id(0x00);
    packet.write_string(&serde_json::to_string(message)?);
    stream.write_packet(&packet).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Cursor;

    #[test]
    fn version_label_picks_the_smallest_covering_release() {
        assert_eq!(version_label(0), "1.7.5");
        assert_eq!(version_label(4), "1.7.5");
        assert_eq!(version_label(5), "1.7.10");
        assert_eq!(version_label(6), "1.8.9");
        assert_eq!(version_label(47), "1.8.9");
        assert_eq!(version_label(107), "1.9");
        assert_eq!(version_label(108), "future");
    }

    #[tokio::test]
    async fn handshake_round_trip() {
        let mut packet = Packet::with_id(0x00);
        packet.write_var_int(47);
        packet.write_string("Play.Example.COM");
        packet.write_uint16(25565);
        packet.write_var_int(2);

        let mut writer = Stream::new(Cursor::new(Vec::new()));
        writer.write_packet(&packet).await.unwrap();
        let mut cursor = writer.into_inner();
        cursor.set_position(0);

        let mut stream = Stream::new(cursor);
        let mut frame = stream.packet_stream().await.unwrap();
        assert_eq!(frame.read_var_int().await.unwrap(), 0x00);
        let handshake = read_handshake_packet(&mut frame).await.unwrap();
        assert_eq!(
            handshake,
            HandshakePacket {
                protocol_version: 47,
                server_address: "Play.Example.COM".into(),
                server_port: 25565,
                next_state: 2,
            }
        );
        assert_eq!(frame.remaining(), 0);
    }

    #[tokio::test]
    async fn status_response_has_the_documented_shape() {
        let status = Status {
            online_players: 3,
            max_players: 100,
            message: "hi".into(),
            show_connection: true,
            protocol_number: 47,
        };

        let mut writer = Stream::new(Cursor::new(Vec::new()));
        write_handshake_response(&mut writer, &status).await.unwrap();
        let mut cursor = writer.into_inner();
        cursor.set_position(0);

        let mut stream = Stream::new(cursor);
        let mut frame = stream.packet_stream().await.unwrap();
        assert_eq!(frame.read_var_int().await.unwrap(), 0x00);
        let body: serde_json::Value =
            serde_json::from_str(&frame.read_string().await.unwrap()).unwrap();
        assert_eq!(
            body,
            json!({
                "version": {"name": "1lann/beacon 1.8.9", "protocol": 47},
                "players": {"max": 100, "online": 3},
                "description": "hi",
            })
        );
        assert_eq!(frame.remaining(), 0);
    }

    #[tokio::test]
    async fn ping_reply_echoes_the_nonce() {
        let (near, far) = tokio::io::duplex(128);
        let mut client = Stream::new(near);
        let mut server = Stream::new(far);

        let mut ping = Packet::with_id(0x01);
        ping.write_int64(0x0123_4567_89AB_CDEF);
        client.write_packet(&ping).await.unwrap();

        let mut frame = server.packet_stream().await.unwrap();
        assert_eq!(frame.read_var_int().await.unwrap(), 0x01);
        let status = Status {
            show_connection: true,
            ..Default::default()
        };
        handle_ping_packet(&mut frame, &status).await.unwrap();
        assert_eq!(frame.remaining(), 0);

        let mut reply = client.packet_stream().await.unwrap();
        assert_eq!(reply.read_var_int().await.unwrap(), 0x01);
        assert_eq!(reply.read_int64().await.unwrap(), 0x0123_4567_89AB_CDEF);
    }

    #[tokio::test]
    async fn hidden_status_swallows_the_nonce() {
        let (near, far) = tokio::io::duplex(128);
        let mut client = Stream::new(near);
        let mut server = Stream::new(far);

        let mut ping = Packet::with_id(0x01);
        ping.write_int64(7);
        client.write_packet(&ping).await.unwrap();

        let mut frame = server.packet_stream().await.unwrap();
        assert_eq!(frame.read_var_int().await.unwrap(), 0x01);
        handle_ping_packet(&mut frame, &Status::default())
            .await
            .unwrap();
        // The nonce was consumed even though no reply went out.
        assert_eq!(frame.remaining(), 0);
    }

    #[tokio::test]
    async fn disconnect_message_is_a_json_string_scalar() {
        let mut writer = Stream::new(Cursor::new(Vec::new()));
        display_message(&mut writer, "Hello \"Alice\"").await.unwrap();
        let mut cursor = writer.into_inner();
        cursor.set_position(0);

        let mut stream = Stream::new(cursor);
        let mut frame = stream.packet_stream().await.unwrap();
        assert_eq!(frame.read_var_int().await.unwrap(), 0x00);
        let payload = frame.read_string().await.unwrap();
        let decoded: String = serde_json::from_str(&payload).unwrap();
        assert_eq!(decoded, "Hello \"Alice\"");
    }
}
