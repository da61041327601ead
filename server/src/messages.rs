use realm_shared::{
    ByteReader, ByteWriter, DeltaPacket, EntitySnapshot, SerdeErr, Tick,
};

/// Game-level message codes carried inside data frames.
const SYNC_FULL: u8 = 1;
const SYNC_DELTA: u8 = 2;
const SYNC_DESPAWN: u8 = 3;

const INPUT_MOVE: u8 = 1;
const INPUT_TARGET: u8 = 2;
const INPUT_ACK: u8 = 3;

/// Server-to-client state sync payloads.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncMessage {
    /// Complete snapshot of one entity; establishes a baseline.
    FullSnapshot { entity: u64, snapshot: EntitySnapshot },
    /// Field delta against the entity's acknowledged baseline.
    Delta { entity: u64, delta: DeltaPacket },
    /// The entity left the observer's interest set.
    Despawn { entity: u64 },
}

impl SyncMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        match self {
            SyncMessage::FullSnapshot { entity, snapshot } => {
                writer.write_u8(SYNC_FULL);
                writer.write_u64(*entity);
                snapshot.ser(&mut writer);
            }
            SyncMessage::Delta { entity, delta } => {
                writer.write_u8(SYNC_DELTA);
                writer.write_u64(*entity);
                delta.ser(&mut writer);
            }
            SyncMessage::Despawn { entity } => {
                writer.write_u8(SYNC_DESPAWN);
                writer.write_u64(*entity);
            }
        }
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = ByteReader::new(bytes);
        match reader.read_u8()? {
            SYNC_FULL => Ok(SyncMessage::FullSnapshot {
                entity: reader.read_u64()?,
                snapshot: EntitySnapshot::de(&mut reader)?,
            }),
            SYNC_DELTA => Ok(SyncMessage::Delta {
                entity: reader.read_u64()?,
                delta: DeltaPacket::de(&mut reader)?,
            }),
            SYNC_DESPAWN => Ok(SyncMessage::Despawn {
                entity: reader.read_u64()?,
            }),
            value => Err(SerdeErr::UnknownDiscriminant {
                type_name: "SyncMessage",
                value: value as u16,
            }),
        }
    }
}

/// Client-to-server input payloads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InputMessage {
    /// Desired movement direction (unnormalized is tolerated).
    Move { direction: [f32; 3] },
    /// Select a combat target (0 clears).
    Target { entity: u64 },
    /// The client acknowledges having applied state up to this tick.
    AckTick { tick: Tick },
}

impl InputMessage {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        match self {
            InputMessage::Move { direction } => {
                writer.write_u8(INPUT_MOVE);
                writer.write_f32(direction[0]);
                writer.write_f32(direction[1]);
                writer.write_f32(direction[2]);
            }
            InputMessage::Target { entity } => {
                writer.write_u8(INPUT_TARGET);
                writer.write_u64(*entity);
            }
            InputMessage::AckTick { tick } => {
                writer.write_u8(INPUT_ACK);
                writer.write_u32(*tick);
            }
        }
        writer.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerdeErr> {
        let mut reader = ByteReader::new(bytes);
        match reader.read_u8()? {
            INPUT_MOVE => Ok(InputMessage::Move {
                direction: [reader.read_f32()?, reader.read_f32()?, reader.read_f32()?],
            }),
            INPUT_TARGET => Ok(InputMessage::Target {
                entity: reader.read_u64()?,
            }),
            INPUT_ACK => Ok(InputMessage::AckTick {
                tick: reader.read_u32()?,
            }),
            value => Err(SerdeErr::UnknownDiscriminant {
                type_name: "InputMessage",
                value: value as u16,
            }),
        }
    }
}
