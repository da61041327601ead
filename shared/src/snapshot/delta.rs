use realm_serde::{ByteReader, ByteWriter, SerdeErr};
use thiserror::Error;

use crate::types::Tick;

use super::field_value::FieldValue;
use super::snapshot::EntitySnapshot;

/// Scale of the quantized float deltas: hundredths.
const FLOAT_DELTA_SCALE: f32 = 100.0;

/// Wire type tags for field changes.
const TAG_FULL: u8 = 0;
const TAG_FLOAT_DELTA: u8 = 1;
const TAG_VEC3_DELTA: u8 = 2;
const TAG_TOMBSTONE: u8 = 0xFF;

/// Errors from applying a delta to a baseline
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeltaError {
    /// The delta was built against a different baseline tick; the applier
    /// must discard it and request a full snapshot.
    #[error("delta expects baseline tick {expected} but applier holds {actual}")]
    BaselineMismatch { expected: Tick, actual: Tick },
    /// A relative change arrived for a field whose baseline value has a
    /// different type (or is missing).
    #[error("field {field} cannot accept a relative change")]
    IncompatibleField { field: String },
}

/// One field's change between two snapshots.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldChange {
    /// Full replacement value.
    Full(FieldValue),
    /// Quantized change of a float field, in hundredths.
    FloatDelta(i16),
    /// Quantized component-wise change of a vec3 field, in hundredths.
    Vec3Delta([i16; 3]),
    /// The field no longer exists in the new snapshot.
    Tombstone,
}

/// A field-granular delta between two snapshots of one entity.
#[derive(Clone, Debug, PartialEq)]
pub struct DeltaPacket {
    pub old_tick: Tick,
    pub new_tick: Tick,
    pub changes: Vec<(String, FieldChange)>,
}

impl DeltaPacket {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.old_tick);
        writer.write_u32(self.new_tick);
        writer.write_u16(self.changes.len() as u16);
        for (name, change) in &self.changes {
            writer.write_string(name);
            match change {
                FieldChange::Full(value) => {
                    writer.write_u8(TAG_FULL);
                    value.ser(writer);
                }
                FieldChange::FloatDelta(delta) => {
                    writer.write_u8(TAG_FLOAT_DELTA);
                    writer.write_i16(*delta);
                }
                FieldChange::Vec3Delta(delta) => {
                    writer.write_u8(TAG_VEC3_DELTA);
                    writer.write_i16(delta[0]);
                    writer.write_i16(delta[1]);
                    writer.write_i16(delta[2]);
                }
                FieldChange::Tombstone => {
                    writer.write_u8(TAG_TOMBSTONE);
                }
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let old_tick = reader.read_u32()?;
        let new_tick = reader.read_u32()?;
        let count = reader.read_u16()?;
        let mut changes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = reader.read_string()?;
            let change = match reader.read_u8()? {
                TAG_FULL => FieldChange::Full(FieldValue::de(reader)?),
                TAG_FLOAT_DELTA => FieldChange::FloatDelta(reader.read_i16()?),
                TAG_VEC3_DELTA => FieldChange::Vec3Delta([
                    reader.read_i16()?,
                    reader.read_i16()?,
                    reader.read_i16()?,
                ]),
                TAG_TOMBSTONE => FieldChange::Tombstone,
                value => {
                    return Err(SerdeErr::UnknownDiscriminant {
                        type_name: "FieldChange",
                        value: value as u16,
                    })
                }
            };
            changes.push((name, change));
        }
        Ok(Self {
            old_tick,
            new_tick,
            changes,
        })
    }
}

fn quantize(delta: f32) -> Option<i16> {
    let scaled = (delta * FLOAT_DELTA_SCALE).round();
    if scaled.abs() <= i16::MAX as f32 {
        Some(scaled as i16)
    } else {
        None
    }
}

/// Builds the field-granular delta from `old` to `new`. Identical snapshots
/// produce zero changes. Float and vec3 fields whose change fits sixteen
/// bits of hundredths go out relative; everything else is a full value.
pub fn create_delta(old: &EntitySnapshot, new: &EntitySnapshot) -> DeltaPacket {
    let mut changes = Vec::new();

    for (name, new_value) in &new.fields {
        match old.fields.get(name) {
            Some(old_value) if old_value == new_value => {}
            Some(FieldValue::Float(old_float)) => {
                if let FieldValue::Float(new_float) = new_value {
                    match quantize(new_float - old_float) {
                        Some(delta) => changes.push((name.clone(), FieldChange::FloatDelta(delta))),
                        None => changes.push((name.clone(), FieldChange::Full(new_value.clone()))),
                    }
                } else {
                    changes.push((name.clone(), FieldChange::Full(new_value.clone())));
                }
            }
            Some(FieldValue::Vec3(old_vec)) => {
                if let FieldValue::Vec3(new_vec) = new_value {
                    let quantized = [
                        quantize(new_vec[0] - old_vec[0]),
                        quantize(new_vec[1] - old_vec[1]),
                        quantize(new_vec[2] - old_vec[2]),
                    ];
                    match quantized {
                        [Some(x), Some(y), Some(z)] => {
                            changes.push((name.clone(), FieldChange::Vec3Delta([x, y, z])))
                        }
                        _ => changes.push((name.clone(), FieldChange::Full(new_value.clone()))),
                    }
                } else {
                    changes.push((name.clone(), FieldChange::Full(new_value.clone())));
                }
            }
            _ => changes.push((name.clone(), FieldChange::Full(new_value.clone()))),
        }
    }

    for name in old.fields.keys() {
        if !new.fields.contains_key(name) {
            changes.push((name.clone(), FieldChange::Tombstone));
        }
    }

    DeltaPacket {
        old_tick: old.tick,
        new_tick: new.tick,
        changes,
    }
}

/// Applies `delta` to `state`, producing the new snapshot. The caller must
/// hold the exact baseline the delta was created against; on a tick mismatch
/// the delta is rejected and a full snapshot must be requested.
pub fn apply_delta(state: &EntitySnapshot, delta: &DeltaPacket) -> Result<EntitySnapshot, DeltaError> {
    if state.tick != delta.old_tick {
        return Err(DeltaError::BaselineMismatch {
            expected: delta.old_tick,
            actual: state.tick,
        });
    }

    let mut next = state.clone();
    next.tick = delta.new_tick;

    for (name, change) in &delta.changes {
        match change {
            FieldChange::Full(value) => {
                next.fields.insert(name.clone(), value.clone());
            }
            FieldChange::FloatDelta(quantized) => match next.fields.get_mut(name) {
                Some(FieldValue::Float(value)) => {
                    *value += *quantized as f32 / FLOAT_DELTA_SCALE;
                }
                _ => {
                    return Err(DeltaError::IncompatibleField { field: name.clone() });
                }
            },
            FieldChange::Vec3Delta(quantized) => match next.fields.get_mut(name) {
                Some(FieldValue::Vec3(value)) => {
                    for axis in 0..3 {
                        value[axis] += quantized[axis] as f32 / FLOAT_DELTA_SCALE;
                    }
                }
                _ => {
                    return Err(DeltaError::IncompatibleField { field: name.clone() });
                }
            },
            FieldChange::Tombstone => {
                next.fields.remove(name);
            }
        }
    }

    Ok(next)
}
