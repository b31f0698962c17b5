//! Content fingerprinting — staleness detection for derived graph data.
//!
//! A fingerprint is a SHA-256 digest over the ordered, canonicalized
//! serialization of all source records. It does not identify *which*
//! records changed, only *that* something changed: two computations over
//! identical source data are byte-identical, and any field change,
//! insertion, or deletion changes the digest.

use crate::types::SourceRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Field delimiter for the canonical serialization. A control character
/// so that labels containing pipes or commas cannot forge a boundary.
const FIELD_SEP: char = '\x1f';

/// A deterministic digest of the source-record set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the fingerprint of a source-record set.
///
/// Order-independent with respect to input ordering: records are sorted
/// by kind and primary key before hashing, so insertion order never
/// affects the result.
pub fn fingerprint(records: &[SourceRecord]) -> Fingerprint {
    let mut canonical: Vec<String> = records.iter().map(canonical_line).collect();
    canonical.sort();

    let mut hasher = Sha256::new();
    for line in &canonical {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    Fingerprint(format!("{:x}", hasher.finalize()))
}

fn canonical_line(record: &SourceRecord) -> String {
    match record {
        SourceRecord::Topic(t) => {
            format!("topic{sep}{}{sep}{}", t.id, t.label, sep = FIELD_SEP)
        }
        SourceRecord::Item(i) => format!(
            "item{sep}{}{sep}{}{sep}{}",
            i.id,
            i.topic_id,
            i.label,
            sep = FIELD_SEP
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemRecord, TopicRecord};

    fn sample() -> Vec<SourceRecord> {
        vec![
            SourceRecord::Topic(TopicRecord::new(1, "Rust")),
            SourceRecord::Item(ItemRecord::new(10, 1, "Ownership")),
            SourceRecord::Item(ItemRecord::new(11, 1, "Lifetimes")),
            SourceRecord::Topic(TopicRecord::new(2, "Databases")),
        ]
    }

    #[test]
    fn identical_input_is_byte_identical() {
        assert_eq!(fingerprint(&sample()), fingerprint(&sample()));
    }

    #[test]
    fn permuting_input_order_yields_same_digest() {
        let mut shuffled = sample();
        shuffled.reverse();
        assert_eq!(fingerprint(&sample()), fingerprint(&shuffled));

        let mut rotated = sample();
        rotated.rotate_left(2);
        assert_eq!(fingerprint(&sample()), fingerprint(&rotated));
    }

    #[test]
    fn changing_any_field_changes_digest() {
        let base = fingerprint(&sample());

        let mut relabeled = sample();
        if let SourceRecord::Item(item) = &mut relabeled[1] {
            item.label = "Borrowing".to_string();
        }
        assert_ne!(base, fingerprint(&relabeled));

        let mut reowned = sample();
        if let SourceRecord::Item(item) = &mut reowned[2] {
            item.topic_id = 2;
        }
        assert_ne!(base, fingerprint(&reowned));
    }

    #[test]
    fn insertion_and_deletion_change_digest() {
        let base = fingerprint(&sample());

        let mut grown = sample();
        grown.push(SourceRecord::Item(ItemRecord::new(20, 2, "Indexes")));
        assert_ne!(base, fingerprint(&grown));

        let mut shrunk = sample();
        shrunk.pop();
        assert_ne!(base, fingerprint(&shrunk));
    }

    #[test]
    fn empty_set_has_a_stable_digest() {
        assert_eq!(fingerprint(&[]), fingerprint(&[]));
        assert_ne!(fingerprint(&[]), fingerprint(&sample()));
    }

    #[test]
    fn same_pk_different_kind_is_distinct() {
        let a = vec![SourceRecord::Topic(TopicRecord::new(1, "X"))];
        let b = vec![SourceRecord::Item(ItemRecord::new(1, 1, "X"))];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
