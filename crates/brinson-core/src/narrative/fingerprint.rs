use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::attribution::engine::{AttributionScheme, AttributionTable, SegmentRecord};

const DOMAIN_TAG: &[u8] = b"brinson-segment-table-v1";

/// SHA-256 over the canonical encoding of a segment table's inputs and
/// attribution scheme.
///
/// A scheme tag byte follows the domain tag. Rows are then hashed in order
/// as a length-prefixed id followed by the four inputs as little-endian
/// IEEE-754 bits, with `-0.0` folded into `0.0`. Computed effects are not
/// hashed: they are a pure function of the inputs and the scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableFingerprint([u8; 32]);

impl TableFingerprint {
    pub fn of_segments(segments: &[SegmentRecord], scheme: AttributionScheme) -> Self {
        Self::hash_rows(scheme, segments.iter().map(|s| {
            (
                s.segment_id.as_str(),
                [s.fund_weight, s.benchmark_weight, s.fund_return, s.benchmark_return],
            )
        }))
    }

    pub fn of_table(table: &AttributionTable) -> Self {
        Self::hash_rows(table.scheme, table.rows.iter().map(|r| {
            (
                r.segment_id.as_str(),
                [r.fund_weight, r.benchmark_weight, r.fund_return, r.benchmark_return],
            )
        }))
    }

    fn hash_rows<'a>(
        scheme: AttributionScheme,
        rows: impl Iterator<Item = (&'a str, [f64; 4])>,
    ) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_TAG);
        hasher.update([scheme_tag(scheme)]);
        for (id, values) in rows {
            hasher.update((id.len() as u64).to_le_bytes());
            hasher.update(id.as_bytes());
            for v in values {
                let v = if v == 0.0 { 0.0f64 } else { v };
                hasher.update(v.to_bits().to_le_bytes());
            }
        }
        Self(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

fn scheme_tag(scheme: AttributionScheme) -> u8 {
    match scheme {
        AttributionScheme::ThreeFactor => 0,
        AttributionScheme::TwoFactor => 1,
    }
}

impl fmt::Display for TableFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute, compute_with};

    fn segments() -> Vec<SegmentRecord> {
        vec![
            SegmentRecord::new("Tech", 0.30, 0.20, 0.10, 0.05),
            SegmentRecord::new("Energy", 0.10, 0.20, -0.05, 0.02),
        ]
    }

    fn of(segments: &[SegmentRecord]) -> TableFingerprint {
        TableFingerprint::of_segments(segments, AttributionScheme::ThreeFactor)
    }

    #[test]
    fn test_stable_for_equal_content() {
        assert_eq!(of(&segments()), of(&segments().clone()));
    }

    #[test]
    fn test_table_and_segments_agree() {
        let segs = segments();
        let table = compute(&segs).unwrap();
        assert_eq!(
            TableFingerprint::of_table(&table),
            TableFingerprint::of_segments(&segs, AttributionScheme::ThreeFactor)
        );
    }

    #[test]
    fn test_scheme_changes_fingerprint() {
        let segs = segments();
        let three = compute_with(&segs, AttributionScheme::ThreeFactor).unwrap();
        let two = compute_with(&segs, AttributionScheme::TwoFactor).unwrap();
        assert_ne!(
            TableFingerprint::of_table(&three),
            TableFingerprint::of_table(&two)
        );
        assert_eq!(
            TableFingerprint::of_table(&two),
            TableFingerprint::of_segments(&segs, AttributionScheme::TwoFactor)
        );
    }

    #[test]
    fn test_sensitive_to_values_and_order() {
        let base = of(&segments());

        let mut nudged = segments();
        nudged[1].benchmark_return = 0.020000000000000004;
        assert_ne!(of(&nudged), base);

        let mut reordered = segments();
        reordered.reverse();
        assert_ne!(of(&reordered), base);
    }

    #[test]
    fn test_id_boundaries_are_unambiguous() {
        let a = [SegmentRecord::new("ab", 0.0, 0.0, 0.0, 0.0)];
        let b = [SegmentRecord::new("a", 0.0, 0.0, 0.0, 0.0)];
        assert_ne!(of(&a), of(&b));
    }

    #[test]
    fn test_negative_zero_folded() {
        let pos = [SegmentRecord::new("A", 0.0, 0.5, 0.1, 0.1)];
        let neg = [SegmentRecord::new("A", -0.0, 0.5, 0.1, 0.1)];
        assert_eq!(of(&pos), of(&neg));
    }

    #[test]
    fn test_hex_display() {
        let hex = of(&segments()).to_string();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
