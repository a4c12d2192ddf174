//! Content fingerprint deciding whether a rebuild can be skipped.

use crate::geom::Rect;
use crate::model::{AvailabilityInput, AvailabilityKind, Section};
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderSignature(u64);

impl RenderSignature {
    /// Fingerprint of every input that can change a pass's output.
    ///
    /// The whole sanitized markup is hashed: two different diagrams of the same length
    /// must never look unchanged.
    pub fn compute(
        sanitized_markup: &str,
        view_box: Option<Rect>,
        selection: Option<&str>,
        catalog: &[Section],
        availability: &AvailabilityInput,
    ) -> Self {
        let mut h = FxHasher::default();

        sanitized_markup.len().hash(&mut h);
        sanitized_markup.hash(&mut h);

        match view_box {
            Some(vb) => {
                1u8.hash(&mut h);
                for v in [vb.origin.x, vb.origin.y, vb.size.width, vb.size.height] {
                    v.to_bits().hash(&mut h);
                }
            }
            None => 0u8.hash(&mut h),
        }

        selection.hash(&mut h);

        catalog.len().hash(&mut h);
        for s in catalog {
            s.id.hash(&mut h);
            s.name.hash(&mut h);
            s.svg_path_hint.hash(&mut h);
            s.section_type.hash(&mut h);
            s.capacity.hash(&mut h);
        }

        let kind = availability.kind();
        kind.hash(&mut h);
        if let (AvailabilityKind::Counts, Some(counts)) = (kind, &availability.counts) {
            let mut entries: Vec<(&String, &i64)> = counts.iter().collect();
            entries.sort();
            entries.hash(&mut h);
        }
        availability.records.len().hash(&mut h);
        for r in &availability.records {
            r.section_id.hash(&mut h);
            r.available.hash(&mut h);
            r.available_count.hash(&mut h);
            r.min_price.map(f64::to_bits).hash(&mut h);
        }

        Self(h.finish())
    }

    pub fn value(self) -> u64 {
        self.0
    }
}
