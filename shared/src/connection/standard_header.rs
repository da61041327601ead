use realm_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::types::PacketSeq;

use super::packet_type::PacketType;

/// Size of the big-endian length prefix that frames every packet.
pub const LENGTH_PREFIX_BYTES: usize = 4;

/// Size of the serialized header (type code + flags + sequence + ack).
pub const HEADER_BYTES: usize = 2 + 1 + 4 + 4;

/// Per-packet flag bits carried in the standard header.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// The body was compressed and must be decompressed before parsing.
    pub compressed: bool,
    /// The body was passed through the connection's cipher.
    pub encrypted: bool,
    /// The body holds multiple aggregated child payloads.
    pub aggregated: bool,
    /// The body is a field delta against an acknowledged baseline, not a
    /// full snapshot.
    pub delta: bool,
}

impl PacketFlags {
    pub fn to_u8(self) -> u8 {
        (self.compressed as u8)
            | (self.encrypted as u8) << 1
            | (self.aggregated as u8) << 2
            | (self.delta as u8) << 3
    }

    pub fn from_u8(bits: u8) -> Self {
        Self {
            compressed: bits & 0b0001 != 0,
            encrypted: bits & 0b0010 != 0,
            aggregated: bits & 0b0100 != 0,
            delta: bits & 0b1000 != 0,
        }
    }
}

/// The header found at the front of every framed packet.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct StandardHeader {
    pub packet_type: PacketType,
    pub flags: PacketFlags,
    pub sequence: PacketSeq,
    /// Highest remote sequence seen by the sender of this packet.
    pub ack: PacketSeq,
}

impl StandardHeader {
    pub fn new(packet_type: PacketType, sequence: PacketSeq, ack: PacketSeq) -> Self {
        Self {
            packet_type,
            flags: PacketFlags::default(),
            sequence,
            ack,
        }
    }

    pub fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u16(self.packet_type.to_u16());
        writer.write_u8(self.flags.to_u8());
        writer.write_u32(self.sequence);
        writer.write_u32(self.ack);
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let packet_type = PacketType::from_u16(reader.read_u16()?)?;
        let flags = PacketFlags::from_u8(reader.read_u8()?);
        let sequence = reader.read_u32()?;
        let ack = reader.read_u32()?;
        Ok(Self {
            packet_type,
            flags,
            sequence,
            ack,
        })
    }
}

/// Frames `header` + `body` with the 4-byte big-endian length prefix.
pub fn frame_packet(header: &StandardHeader, body: &[u8]) -> Vec<u8> {
    let mut writer = ByteWriter::with_capacity(LENGTH_PREFIX_BYTES + HEADER_BYTES + body.len());
    writer.write_u32((HEADER_BYTES + body.len()) as u32);
    header.ser(&mut writer);
    writer.write_bytes(body);
    writer.to_bytes()
}

/// Strips the length prefix and header from a framed packet, returning the
/// header and the body bytes.
pub fn parse_frame(bytes: &[u8]) -> Result<(StandardHeader, &[u8]), SerdeErr> {
    let mut reader = ByteReader::new(bytes);
    let length = reader.read_u32()? as usize;
    if length > reader.remaining() {
        return Err(SerdeErr::BadLength {
            length,
            remaining: reader.remaining(),
        });
    }
    let header = StandardHeader::de(&mut reader)?;
    let body_len = length - HEADER_BYTES;
    let offset = reader.offset();
    Ok((header, &bytes[offset..offset + body_len]))
}
