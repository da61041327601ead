cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use zstd::bulk::Decompressor;

        use super::compression_config::CompressionMode;
        use super::error::DecoderError;

        pub struct Decoder {
            result: Vec<u8>,
            decompressor: Decompressor<'static>,
        }

        impl Decoder {
            /// Create a new Decoder with the specified compression mode
            pub fn new(compression_mode: Option<CompressionMode>) -> Result<Self, DecoderError> {
                let decompressor = match compression_mode {
                    None | Some(CompressionMode::Default(_)) => {
                        Decompressor::new().map_err(|_| DecoderError::DecompressorCreationFailed)?
                    }
                    Some(CompressionMode::Dictionary(_, dictionary)) => {
                        Decompressor::with_dictionary(&dictionary)
                            .map_err(|_| DecoderError::DecompressorWithDictionaryFailed)?
                    }
                };

                Ok(Self {
                    decompressor,
                    result: Vec::new(),
                })
            }

            /// Decompress a payload flagged as compressed.
            ///
            /// SECURITY: This method processes untrusted network data. Any
            /// malformed or malicious payload returns an error instead of
            /// panicking.
            pub fn decode(&mut self, payload: &[u8]) -> Result<&[u8], DecoderError> {
                let upper_bound = Decompressor::<'static>::upper_bound(payload)
                    .map_err(|_| DecoderError::UpperBoundCalculationFailed {
                        payload_size: payload.len(),
                    })?;

                self.result = self.decompressor
                    .decompress(payload, upper_bound)
                    .map_err(|_| DecoderError::DecompressionFailed {
                        payload_size: payload.len(),
                    })?;
                Ok(&self.result)
            }
        }
    }
    else
    {
        use super::compression_config::CompressionMode;
        use super::error::DecoderError;

        pub struct Decoder;

        impl Decoder {
            pub fn new(_: Option<CompressionMode>) -> Result<Self, DecoderError> {
                Ok(Self)
            }

            /// A peer sent a compressed payload but this build has no codec.
            pub fn decode(&mut self, payload: &[u8]) -> Result<&[u8], DecoderError> {
                Err(DecoderError::CompressionUnavailable {
                    payload_size: payload.len(),
                })
            }
        }
    }
}
