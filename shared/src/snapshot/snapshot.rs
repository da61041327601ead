use std::collections::BTreeMap;

use realm_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::types::Tick;

use super::field_value::FieldValue;

/// The replicated state of one entity at one tick, keyed by field name.
///
/// Fields are kept in a BTreeMap so iteration (and therefore encoding) order
/// is deterministic, which the tick determinism contract requires.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct EntitySnapshot {
    pub tick: Tick,
    pub fields: BTreeMap<String, FieldValue>,
}

impl EntitySnapshot {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn set(&mut self, name: &str, value: FieldValue) {
        self.fields.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Full-snapshot wire form: tick, field count, then (name, value) pairs.
    pub fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.tick);
        writer.write_u16(self.fields.len() as u16);
        for (name, value) in &self.fields {
            writer.write_string(name);
            value.ser(writer);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.ser(&mut writer);
        writer.to_bytes()
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        let tick = reader.read_u32()?;
        let count = reader.read_u16()?;
        let mut fields = BTreeMap::new();
        for _ in 0..count {
            let name = reader.read_string()?;
            let value = FieldValue::de(reader)?;
            fields.insert(name, value);
        }
        Ok(Self { tick, fields })
    }
}
