pub mod baseline;
pub mod delta;
pub mod field_value;
pub mod snapshot;
