cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use zstd::bulk::Compressor;

        use super::compression_config::CompressionMode;
        use super::error::EncoderError;

        pub struct Encoder {
            result: Vec<u8>,
            compressor: Compressor<'static>,
        }

        impl Encoder {
            /// Create a new Encoder with the specified compression mode
            pub fn new(compression_mode: Option<CompressionMode>) -> Result<Self, EncoderError> {
                let compressor = match compression_mode {
                    None => Compressor::new(0).map_err(|_| EncoderError::CompressorCreationFailed {
                        level: 0,
                    })?,
                    Some(CompressionMode::Default(compression_level)) => {
                        Compressor::new(compression_level).map_err(|_| EncoderError::CompressorCreationFailed {
                            level: compression_level,
                        })?
                    }
                    Some(CompressionMode::Dictionary(compression_level, dictionary)) => {
                        Compressor::with_dictionary(compression_level, &dictionary)
                            .map_err(|_| EncoderError::CompressorWithDictionaryFailed {
                                level: compression_level,
                            })?
                    }
                };

                Ok(Self {
                    result: Vec::new(),
                    compressor,
                })
            }

            /// Compress a payload. Returns Some only when the compressed form
            /// is strictly smaller than the input; callers send the original
            /// bytes otherwise and leave the compressed flag clear.
            pub fn encode(&mut self, payload: &[u8]) -> Result<Option<&[u8]>, EncoderError> {
                self.result = self.compressor.compress(payload).map_err(|_| EncoderError::CompressionFailed {
                    payload_size: payload.len(),
                })?;
                if self.result.len() < payload.len() {
                    Ok(Some(&self.result))
                } else {
                    Ok(None)
                }
            }
        }
    }
    else
    {
        use super::compression_config::CompressionMode;
        use super::error::EncoderError;

        pub struct Encoder;

        impl Encoder {
            pub fn new(_: Option<CompressionMode>) -> Result<Self, EncoderError> {
                Ok(Self)
            }

            /// Without the zstd backend nothing ever shrinks, so every
            /// payload goes out uncompressed.
            pub fn encode(&mut self, _payload: &[u8]) -> Result<Option<&[u8]>, EncoderError> {
                Ok(None)
            }
        }
    }
}
