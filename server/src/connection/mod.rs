mod connection;

pub use connection::{Connection, CONTROL_STREAM};
