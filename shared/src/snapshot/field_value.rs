use realm_serde::{ByteReader, ByteWriter, SerdeErr};

/// One replicated field's value inside an entity snapshot.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Float(f32),
    Vec3([f32; 3]),
    Bool(bool),
    UInt(u64),
    Int(i64),
    Str(String),
}

impl FieldValue {
    fn kind_code(&self) -> u8 {
        match self {
            FieldValue::Float(_) => 0,
            FieldValue::Vec3(_) => 1,
            FieldValue::Bool(_) => 2,
            FieldValue::UInt(_) => 3,
            FieldValue::Int(_) => 4,
            FieldValue::Str(_) => 5,
        }
    }

    pub fn ser(&self, writer: &mut ByteWriter) {
        writer.write_u8(self.kind_code());
        match self {
            FieldValue::Float(value) => writer.write_f32(*value),
            FieldValue::Vec3(value) => {
                writer.write_f32(value[0]);
                writer.write_f32(value[1]);
                writer.write_f32(value[2]);
            }
            FieldValue::Bool(value) => writer.write_bool(*value),
            FieldValue::UInt(value) => writer.write_u64(*value),
            FieldValue::Int(value) => writer.write_i64(*value),
            FieldValue::Str(value) => writer.write_string(value),
        }
    }

    pub fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        match reader.read_u8()? {
            0 => Ok(FieldValue::Float(reader.read_f32()?)),
            1 => Ok(FieldValue::Vec3([
                reader.read_f32()?,
                reader.read_f32()?,
                reader.read_f32()?,
            ])),
            2 => Ok(FieldValue::Bool(reader.read_bool()?)),
            3 => Ok(FieldValue::UInt(reader.read_u64()?)),
            4 => Ok(FieldValue::Int(reader.read_i64()?)),
            5 => Ok(FieldValue::Str(reader.read_string()?)),
            value => Err(SerdeErr::UnknownDiscriminant {
                type_name: "FieldValue",
                value: value as u16,
            }),
        }
    }
}
