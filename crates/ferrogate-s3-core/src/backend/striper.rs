//! Stripe layout arithmetic for big-pool objects.
//!
//! A logical object is cut into stripe units that are dealt round-robin over
//! `stripe_count` backend objects. Once each of those objects reaches
//! `object_size`, the next set of `stripe_count` objects starts.

/// Default stripe unit.
pub const DEFAULT_STRIPE_UNIT: u64 = 512 * 1024;
/// Default number of objects a stripe spans.
pub const DEFAULT_STRIPE_COUNT: u64 = 2;
/// Default size of each backend object.
pub const DEFAULT_OBJECT_SIZE: u64 = 8 * 1024 * 1024;

/// One contiguous piece of a logical range inside a single backend object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    /// Index of the backend object within the striped set.
    pub object_no: u64,
    /// Offset inside that backend object.
    pub object_offset: u64,
    /// Length of the piece.
    pub length: u64,
    /// Offset of the piece relative to the start of the requested range.
    pub buffer_offset: u64,
}

/// Parameters of a striped layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripeLayout {
    /// Bytes written to one object before moving to the next.
    pub stripe_unit: u64,
    /// Objects a stripe is spread across.
    pub stripe_count: u64,
    /// Capacity of one backend object.
    pub object_size: u64,
}

impl Default for StripeLayout {
    fn default() -> Self {
        Self {
            stripe_unit: DEFAULT_STRIPE_UNIT,
            stripe_count: DEFAULT_STRIPE_COUNT,
            object_size: DEFAULT_OBJECT_SIZE,
        }
    }
}

impl StripeLayout {
    /// Map the logical range `[offset, offset + length)` onto backend extents,
    /// in logical order.
    #[must_use]
    pub fn extents(&self, offset: u64, length: u64) -> Vec<Extent> {
        let stripes_per_object = (self.object_size / self.stripe_unit).max(1);
        let mut extents = Vec::new();
        let mut pos = offset;
        let end = offset + length;

        while pos < end {
            let block_no = pos / self.stripe_unit;
            let stripe_no = block_no / self.stripe_count;
            let stripe_pos = block_no % self.stripe_count;
            let object_set = stripe_no / stripes_per_object;
            let object_no = object_set * self.stripe_count + stripe_pos;
            let block_offset = pos % self.stripe_unit;
            let object_offset = (stripe_no % stripes_per_object) * self.stripe_unit + block_offset;
            let len = (self.stripe_unit - block_offset).min(end - pos);

            extents.push(Extent {
                object_no,
                object_offset,
                length: len,
                buffer_offset: pos - offset,
            });
            pos += len;
        }
        extents
    }

    /// Name of the backend object holding stripe object `object_no` of `object_id`.
    #[must_use]
    pub fn stripe_name(object_id: &str, object_no: u64) -> String {
        format!("{object_id}.{object_no:016x}")
    }
}
