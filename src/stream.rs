use std::io;

use byteorder::{BigEndian, ByteOrder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::packet::Packet;

// The scalar readers are identical for the raw stream and for the
// packet-bounded view; the only difference is `fill`, which the bounded view
// checks against its byte budget first.
macro_rules! typed_reads {
    () => {
        /// Reads the next single byte.
        pub async fn read_byte(&mut self) -> Result<u8> {
            let mut buf = [0u8; 1];
            self.fill(&mut buf).await?;
            Ok(buf[0])
        }

        /// Reads the next byte as a boolean. Any value other than 0x00 or
        /// 0x01 is invalid data.
        pub async fn read_boolean(&mut self) -> Result<bool> {
            match self.read_byte().await? {
                0x00 => Ok(false),
                0x01 => Ok(true),
                other => Err(Error::InvalidBool(other)),
            }
        }

        pub async fn read_signed_byte(&mut self) -> Result<i8> {
            Ok(self.read_byte().await? as i8)
        }

        pub async fn read_int16(&mut self) -> Result<i16> {
            let mut buf = [0u8; 2];
            self.fill(&mut buf).await?;
            Ok(BigEndian::read_i16(&buf))
        }

        pub async fn read_uint16(&mut self) -> Result<u16> {
            let mut buf = [0u8; 2];
            self.fill(&mut buf).await?;
            Ok(BigEndian::read_u16(&buf))
        }

        pub async fn read_int32(&mut self) -> Result<i32> {
            let mut buf = [0u8; 4];
            self.fill(&mut buf).await?;
            Ok(BigEndian::read_i32(&buf))
        }

        pub async fn read_int64(&mut self) -> Result<i64> {
            let mut buf = [0u8; 8];
            self.fill(&mut buf).await?;
            Ok(BigEndian::read_i64(&buf))
        }

        pub async fn read_float32(&mut self) -> Result<f32> {
            let mut buf = [0u8; 4];
            self.fill(&mut buf).await?;
            Ok(BigEndian::read_f32(&buf))
        }

        pub async fn read_float64(&mut self) -> Result<f64> {
            let mut buf = [0u8; 8];
            self.fill(&mut buf).await?;
            Ok(BigEndian::read_f64(&buf))
        }

        /// Reads a VarInt, re-narrowing the 64-bit result.
        pub async fn read_var_int(&mut self) -> Result<i32> {
            Ok(self.read_var_int64().await? as i32)
        }

        /// Reads a VarInt of up to 10 bytes as an i64. Group bits shifted
        /// past bit 63 are discarded.
        pub async fn read_var_int64(&mut self) -> Result<i64> {
            let mut size = 0u32;
            let mut num = 0u64;
            loop {
                let byte = self.read_byte().await?;
                if size * 7 < 64 {
                    num |= u64::from(byte & 0x7F) << (size * 7);
                }
                size += 1;
                if size > 10 {
                    return Err(Error::VarIntTooLong);
                }
                if byte & 0x80 == 0 {
                    break;
                }
            }
            Ok(num as i64)
        }

        /// Reads a VarInt length prefix and exactly that many bytes of
        /// UTF-8.
        pub async fn read_string(&mut self) -> Result<String> {
            let length = self.read_var_int().await?;
            if length < 0 {
                return Err(Error::BadStringLength(length));
            }
            let mut data = vec![0u8; length as usize];
            self.fill(&mut data).await?;
            Ok(String::from_utf8(data)?)
        }
    };
}

/// A two-way stream of protocol data to and from the peer. Wraps any async
/// byte transport; all reads block until satisfied.
pub struct Stream<C> {
    conn: C,
}

impl<C> Stream<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }

    pub fn get_mut(&mut self) -> &mut C {
        &mut self.conn
    }

    pub fn into_inner(self) -> C {
        self.conn
    }
}

impl<C: AsyncRead + Unpin> Stream<C> {
    async fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        self.conn.read_exact(buf).await?;
        Ok(())
    }

    typed_reads!();

    /// Reads the next frame's VarInt length and returns a view over this
    /// stream bounded to that many bytes. A zero or negative length is
    /// invalid data.
    pub async fn packet_stream(&mut self) -> Result<PacketStream<'_, C>> {
        let length = self.read_var_int().await?;
        if length <= 0 {
            return Err(Error::BadFrameLength(length));
        }
        Ok(PacketStream {
            stream: self,
            remaining: length as usize,
        })
    }
}

impl<C: AsyncWrite + Unpin> Stream<C> {
    /// Writes the VarInt length of the packet followed by its payload as a
    /// single coalesced write, so a frame is never interleaved.
    pub async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        let mut frame = Packet::new();
        frame.write_var_int(packet.data().len() as i32);
        frame.write_raw(packet.data());
        self.conn.write_all(frame.data()).await?;
        self.conn.flush().await?;
        Ok(())
    }
}

/// A view over a [`Stream`] limited to a single packet. Typed reads draw
/// down the byte budget and never overread the underlying stream.
pub struct PacketStream<'a, C> {
    stream: &'a mut Stream<C>,
    remaining: usize,
}

impl<C> PacketStream<'_, C> {
    /// Bytes of the current packet not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// The underlying stream, for writing replies mid-packet.
    pub fn stream_mut(&mut self) -> &mut Stream<C> {
        self.stream
    }
}

impl<C: AsyncRead + Unpin> PacketStream<'_, C> {
    async fn fill(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.len() > self.remaining {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past the end of the packet frame",
            )));
        }
        self.stream.fill(buf).await?;
        self.remaining -= buf.len();
        Ok(())
    }

    typed_reads!();

    /// Discards whatever remains of the packet so the stream cursor lands on
    /// the next frame. Returns the number of bytes thrown away.
    pub async fn exhaust_packet(&mut self) -> Result<usize> {
        let tail = self.remaining;
        if tail == 0 {
            return Ok(0);
        }
        let mut sink = vec![0u8; tail];
        self.fill(&mut sink).await?;
        Ok(tail)
    }
}

impl<C: AsyncWrite + Unpin> PacketStream<'_, C> {
    pub async fn write_packet(&mut self, packet: &Packet) -> Result<()> {
        self.stream.write_packet(packet).await
    }
}
