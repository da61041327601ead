use crate::connection::network_conditions::NetworkConditions;

/// Per-connection quality settings chosen by the adaptive helper and applied
/// by the sync orchestrator each adaptation interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QualitySettings {
    /// Ceiling on the per-entity update cadence for this connection.
    pub update_rate_hz: u8,
    /// Quantization width for replicated position components.
    pub position_precision_bits: u8,
    pub enable_compression: bool,
    pub enable_aggregation: bool,
}

impl QualitySettings {
    pub fn best() -> Self {
        Self {
            update_rate_hz: 30,
            position_precision_bits: 16,
            enable_compression: false,
            enable_aggregation: false,
        }
    }
}

/// Observes a connection's measured conditions and picks quality settings.
///
/// Thresholds are deliberately coarse: the point is to shed load smoothly as
/// the link degrades, not to chase every sample.
pub struct AdaptiveQuality;

impl AdaptiveQuality {
    pub fn evaluate(
        conditions: &NetworkConditions,
        bytes_per_second: usize,
        bandwidth_limit: usize,
    ) -> QualitySettings {
        let latency = conditions.rtt_ms();
        let jitter = conditions.jitter_ms();
        let loss = conditions.loss_rate();

        let saturated = bandwidth_limit != 0 && bytes_per_second * 4 >= bandwidth_limit * 3;

        if loss > 0.10 || latency > 400.0 {
            return QualitySettings {
                update_rate_hz: 5,
                position_precision_bits: 10,
                enable_compression: true,
                enable_aggregation: true,
            };
        }

        if loss > 0.05 || latency > 200.0 || jitter > 50.0 || saturated {
            return QualitySettings {
                update_rate_hz: 10,
                position_precision_bits: 12,
                enable_compression: true,
                enable_aggregation: true,
            };
        }

        if loss > 0.01 || latency > 100.0 {
            return QualitySettings {
                update_rate_hz: 20,
                position_precision_bits: 14,
                enable_compression: false,
                enable_aggregation: true,
            };
        }

        QualitySettings::best()
    }
}
