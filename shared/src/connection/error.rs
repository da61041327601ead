use realm_serde::SerdeErr;
use thiserror::Error;

/// Errors that can occur during connection encoding operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncoderError {
    /// Failed to create compressor with the specified configuration
    #[error("Failed to create compressor with compression level {level}")]
    CompressorCreationFailed { level: i32 },

    /// Failed to create compressor with dictionary
    #[error("Failed to create compressor with dictionary (compression level {level})")]
    CompressorWithDictionaryFailed { level: i32 },

    /// Compression operation failed
    #[error("Failed to compress payload of {payload_size} bytes")]
    CompressionFailed { payload_size: usize },
}

/// Errors that can occur during connection decoding operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    /// Failed to create decompressor
    #[error("Failed to create decompressor")]
    DecompressorCreationFailed,

    /// Failed to create decompressor with dictionary
    #[error("Failed to create decompressor with dictionary")]
    DecompressorWithDictionaryFailed,

    /// Upper bound calculation failed for a compressed payload
    #[error("Could not determine decompressed size for payload of {payload_size} bytes")]
    UpperBoundCalculationFailed { payload_size: usize },

    /// Decompression operation failed
    #[error("Failed to decompress payload of {payload_size} bytes")]
    DecompressionFailed { payload_size: usize },

    /// A compressed payload arrived but this build carries no codec
    #[error("Received compressed payload of {payload_size} bytes but compression support is not enabled")]
    CompressionUnavailable { payload_size: usize },
}

/// Errors that can occur while processing a connection's packets
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The packet bytes could not be parsed
    #[error("malformed packet: {0}")]
    Malformed(#[from] SerdeErr),

    /// The packet body failed to decompress
    #[error("decode failed: {0}")]
    Decode(#[from] DecoderError),

    /// The packet body failed to compress
    #[error("encode failed: {0}")]
    Encode(#[from] EncoderError),

    /// The packet body failed to decrypt
    #[error("cipher rejected payload of {payload_size} bytes")]
    CipherRejected { payload_size: usize },

    /// An encrypted packet arrived but no cipher is installed
    #[error("received encrypted payload but no cipher is installed")]
    CipherMissing,

    /// The remote host closed the connection
    #[error("connection closed by remote host")]
    Closed,
}
