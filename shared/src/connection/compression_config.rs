/// Compression settings for a connection's encoder/decoder pair.
#[derive(Clone)]
pub struct CompressionConfig {
    pub server_to_client: Option<CompressionMode>,
    pub client_to_server: Option<CompressionMode>,
}

impl CompressionConfig {
    pub fn new(
        server_to_client: Option<CompressionMode>,
        client_to_server: Option<CompressionMode>,
    ) -> Self {
        Self {
            server_to_client,
            client_to_server,
        }
    }
}

#[derive(Clone)]
pub enum CompressionMode {
    /// Compression at the given level with no shared dictionary.
    Default(i32),
    /// Compression at the given level with a pre-trained dictionary.
    Dictionary(i32, Vec<u8>),
}
