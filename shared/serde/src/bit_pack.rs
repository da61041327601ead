use thiserror::Error;

/// Errors raised when a quantization request is malformed
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QuantizeError {
    /// Bit width must be in 1..=32
    #[error("cannot quantize into {bits} bits, supported range is 1..=32")]
    BadBitWidth { bits: u8 },
    /// The value range must be non-empty
    #[error("cannot quantize over empty range [{min}, {max}]")]
    EmptyRange { min: f32, max: f32 },
}

/// Quantizes `value` into `bits` bits over `[min, max]` by linear map, clamp
/// and round. The result occupies the low `bits` bits of the returned u32.
pub fn pack_float(value: f32, min: f32, max: f32, bits: u8) -> Result<u32, QuantizeError> {
    if bits == 0 || bits > 32 {
        return Err(QuantizeError::BadBitWidth { bits });
    }
    if max <= min {
        return Err(QuantizeError::EmptyRange { min, max });
    }

    let max_quantized = if bits == 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    };

    let clamped = value.clamp(min, max);
    let normalized = (clamped - min) / (max - min);
    let scaled = normalized as f64 * max_quantized as f64;

    Ok((scaled.round() as u64).min(max_quantized as u64) as u32)
}

/// Inverse of [`pack_float`]. The reconstruction error is bounded by
/// `(max - min) / 2^bits`.
pub fn unpack_float(quantized: u32, min: f32, max: f32, bits: u8) -> Result<f32, QuantizeError> {
    if bits == 0 || bits > 32 {
        return Err(QuantizeError::BadBitWidth { bits });
    }
    if max <= min {
        return Err(QuantizeError::EmptyRange { min, max });
    }

    let max_quantized = if bits == 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    };

    let normalized = quantized.min(max_quantized) as f32 / max_quantized as f32;
    Ok(min + normalized * (max - min))
}

/// Quantizes a position vector component-wise.
pub fn pack_vec3(value: [f32; 3], min: f32, max: f32, bits: u8) -> Result<[u32; 3], QuantizeError> {
    Ok([
        pack_float(value[0], min, max, bits)?,
        pack_float(value[1], min, max, bits)?,
        pack_float(value[2], min, max, bits)?,
    ])
}

/// Inverse of [`pack_vec3`].
pub fn unpack_vec3(
    quantized: [u32; 3],
    min: f32,
    max: f32,
    bits: u8,
) -> Result<[f32; 3], QuantizeError> {
    Ok([
        unpack_float(quantized[0], min, max, bits)?,
        unpack_float(quantized[1], min, max, bits)?,
        unpack_float(quantized[2], min, max, bits)?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_bits_rejected() {
        assert_eq!(
            pack_float(1.0, 0.0, 10.0, 0),
            Err(QuantizeError::BadBitWidth { bits: 0 })
        );
    }

    #[test]
    fn empty_range_rejected() {
        assert_eq!(
            pack_float(1.0, 5.0, 5.0, 8),
            Err(QuantizeError::EmptyRange { min: 5.0, max: 5.0 })
        );
    }

    #[test]
    fn clamps_out_of_range_values() {
        let below = pack_float(-100.0, 0.0, 10.0, 8).unwrap();
        let above = pack_float(100.0, 0.0, 10.0, 8).unwrap();

        assert_eq!(below, 0);
        assert_eq!(above, 255);
    }

    #[test]
    fn round_trip_error_is_bounded() {
        let min = -1000.0;
        let max = 1000.0;
        for bits in [8u8, 12, 16, 24] {
            let tolerance = (max - min) / 2f32.powi(bits as i32);
            for value in [-999.9f32, -512.3, -0.01, 0.0, 1.5, 123.456, 999.9] {
                let packed = pack_float(value, min, max, bits).unwrap();
                let unpacked = unpack_float(packed, min, max, bits).unwrap();
                assert!(
                    (unpacked - value).abs() <= tolerance,
                    "bits={} value={} unpacked={} tolerance={}",
                    bits,
                    value,
                    unpacked,
                    tolerance
                );
            }
        }
    }

    #[test]
    fn endpoints_are_exact() {
        for bits in [1u8, 8, 16, 32] {
            let packed_min = pack_float(0.0, 0.0, 64.0, bits).unwrap();
            let packed_max = pack_float(64.0, 0.0, 64.0, bits).unwrap();
            assert_eq!(unpack_float(packed_min, 0.0, 64.0, bits).unwrap(), 0.0);
            assert_eq!(unpack_float(packed_max, 0.0, 64.0, bits).unwrap(), 64.0);
        }
    }

    #[test]
    fn vec3_round_trip() {
        let position = [10.25f32, -3.5, 700.125];
        let packed = pack_vec3(position, -1024.0, 1024.0, 16).unwrap();
        let unpacked = unpack_vec3(packed, -1024.0, 1024.0, 16).unwrap();

        let tolerance = 2048.0 / 65536.0;
        for axis in 0..3 {
            assert!((unpacked[axis] - position[axis]).abs() <= tolerance);
        }
    }
}
