pub mod mock_driver;
pub mod recording_sink;
pub mod test_client;
pub mod test_harness;

pub use mock_driver::MockDriver;
pub use recording_sink::RecordingSink;
pub use test_client::TestClient;
pub use test_harness::TestHarness;
