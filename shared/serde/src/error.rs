use thiserror::Error;

/// Errors that can occur while decoding wire bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Reader ran out of bytes before the value was complete
    #[error("unexpected end of buffer: needed {needed} more bytes at offset {offset}")]
    UnexpectedEnd { offset: usize, needed: usize },
    /// A length prefix exceeded the remaining buffer
    #[error("length prefix {length} exceeds remaining buffer of {remaining} bytes")]
    BadLength { length: usize, remaining: usize },
    /// A string field contained invalid UTF-8
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
    /// An enum discriminant had no known mapping
    #[error("unknown discriminant {value} for {type_name}")]
    UnknownDiscriminant { type_name: &'static str, value: u16 },
}
