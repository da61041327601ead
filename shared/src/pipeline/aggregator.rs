use std::time::Instant;

use realm_serde::{ByteReader, ByteWriter, SerdeErr};

use crate::constants::{
    AGGREGATE_CHILD_HEADER_BYTES, AGGREGATE_COUNT_BYTES, AGGREGATE_FLUSH_AGE, AGGREGATE_FLUSH_FILL,
    AGGREGATE_MAX_BYTES,
};

/// Collects small serialized frames into one MTU-safe aggregate body.
///
/// The body layout is a 2-byte child count followed by N children, each a
/// 4-byte length and the child bytes.
pub struct PacketAggregator {
    children: Vec<Vec<u8>>,
    body_bytes: usize,
    oldest: Option<Instant>,
}

impl PacketAggregator {
    pub fn new() -> Self {
        Self {
            children: Vec::new(),
            body_bytes: AGGREGATE_COUNT_BYTES,
            oldest: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Whether a child of `child_len` bytes would still fit under the
    /// MTU-safe budget.
    pub fn fits(&self, child_len: usize) -> bool {
        self.body_bytes + AGGREGATE_CHILD_HEADER_BYTES + child_len <= AGGREGATE_MAX_BYTES
    }

    /// Adds a serialized frame. The caller must have checked `fits` first.
    pub fn add(&mut self, child: Vec<u8>, now: Instant) {
        debug_assert!(self.fits(child.len()));
        self.body_bytes += AGGREGATE_CHILD_HEADER_BYTES + child.len();
        self.children.push(child);
        if self.oldest.is_none() {
            self.oldest = Some(now);
        }
    }

    /// An aggregate is force-flushed once its oldest child has waited 10 ms
    /// or the body has reached 80 % of the budget.
    pub fn should_flush(&self, now: Instant) -> bool {
        if self.children.is_empty() {
            return false;
        }
        if let Some(oldest) = self.oldest {
            if now.saturating_duration_since(oldest) >= AGGREGATE_FLUSH_AGE {
                return true;
            }
        }
        self.body_bytes as f32 >= AGGREGATE_MAX_BYTES as f32 * AGGREGATE_FLUSH_FILL
    }

    /// Serializes and clears the pending children. Returns None when empty.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        if self.children.is_empty() {
            return None;
        }

        let mut writer = ByteWriter::with_capacity(self.body_bytes);
        writer.write_u16(self.children.len() as u16);
        for child in self.children.drain(..) {
            writer.write_u32(child.len() as u32);
            writer.write_bytes(&child);
        }
        self.body_bytes = AGGREGATE_COUNT_BYTES;
        self.oldest = None;
        Some(writer.to_bytes())
    }
}

impl Default for PacketAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits an aggregate body back into its child byte slices.
pub fn parse_aggregate(body: &[u8]) -> Result<Vec<&[u8]>, SerdeErr> {
    let mut reader = ByteReader::new(body);
    let count = reader.read_u16()? as usize;
    let mut children = Vec::with_capacity(count);
    for _ in 0..count {
        let length = reader.read_u32()? as usize;
        children.push(reader.read_bytes(length)?);
    }
    Ok(children)
}
