use byteorder::{BigEndian, ByteOrder};

/// An outbound protocol packet: a VarInt id followed by typed fields,
/// accumulated into a byte buffer. The packet carries no header; the outer
/// length prefix is prepended by the stream at write time.
#[derive(Clone, Debug, Default)]
pub struct Packet {
    data: Vec<u8>,
}

impl Packet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a packet with the VarInt `id` written as its first field.
    pub fn with_id(id: i32) -> Self {
        let mut packet = Self::new();
        packet.write_var_int(id);
        packet
    }

    /// The accumulated payload, id included.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_signed_byte(&mut self, value: i8) {
        self.data.push(value as u8);
    }

    pub fn write_boolean(&mut self, value: bool) {
        self.data.push(if value { 0x01 } else { 0x00 });
    }

    pub fn write_int16(&mut self, value: i16) {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_uint16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_int32(&mut self, value: i32) {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_int64(&mut self, value: i64) {
        let mut buf = [0u8; 8];
        BigEndian::write_i64(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_float32(&mut self, value: f32) {
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    pub fn write_float64(&mut self, value: f64) {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, value);
        self.data.extend_from_slice(&buf);
    }

    /// Writes an i32 as a VarInt. Negative values sign-extend and encode to
    /// the full 10 bytes.
    pub fn write_var_int(&mut self, value: i32) {
        self.write_var_int64(i64::from(value));
    }

    pub fn write_var_int64(&mut self, value: i64) {
        let mut rest = value as u64;
        loop {
            if rest & !0x7F == 0 {
                self.data.push(rest as u8);
                return;
            }
            self.data.push(((rest & 0x7F) | 0x80) as u8);
            rest >>= 7;
        }
    }

    /// Writes the VarInt byte length of `value` followed by its UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_var_int(value.len() as i32);
        self.data.extend_from_slice(value.as_bytes());
    }

    /// Appends raw bytes verbatim.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}
