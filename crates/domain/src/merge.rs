//! Ordered, duplicate-free merging of paginated identifier sequences.
//!
//! When a new page arrives for a list that already has loaded entries, the
//! freshly fetched identifiers have to be folded into the existing order
//! without introducing duplicates and without disturbing the relative order
//! of entries that are still present. The incoming page is authoritative for
//! its own window: an identifier that appears in both sequences keeps the
//! position dictated by the incoming page, which heals lists where an earlier
//! partial fetch interleaved entries out of server order.

use std::collections::HashSet;
use std::hash::Hash;

/// Which end of the existing sequence a new page attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDirection {
    /// The page follows the existing entries (a "next" fetch).
    Append,
    /// The page precedes the existing entries (a "previous" fetch).
    Prepend,
}

/// Merges two sequences of identifier-bearing values.
///
/// `key_of` extracts the identity used for duplicate detection. Entries of
/// `existing` whose identity also occurs in `incoming` are dropped in favor
/// of the incoming copy, so repeated merges of the same page are idempotent:
/// `merge(merge(a, b), b) == merge(a, b)`.
///
/// Empty inputs short-circuit: an empty `existing` yields `incoming` as
/// given, an empty `incoming` leaves `existing` untouched.
pub fn merge_by_key<T, K, F>(
    existing: &[T],
    incoming: &[T],
    direction: MergeDirection,
    key_of: F,
) -> Vec<T>
where
    T: Clone,
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    if existing.is_empty() {
        return incoming.to_vec();
    }
    if incoming.is_empty() {
        return existing.to_vec();
    }

    let fresh: HashSet<K> = incoming.iter().map(&key_of).collect();
    let survivors = existing.iter().filter(|entry| !fresh.contains(&key_of(entry)));

    let mut merged = Vec::with_capacity(existing.len() + incoming.len());
    match direction {
        MergeDirection::Append => {
            merged.extend(survivors.cloned());
            merged.extend(incoming.iter().cloned());
        }
        MergeDirection::Prepend => {
            merged.extend(incoming.iter().cloned());
            merged.extend(survivors.cloned());
        }
    }
    merged
}

/// Merges two sequences of bare scalar identifiers.
///
/// Convenience variant of [`merge_by_key`] for lists tracked as plain id
/// strings.
#[must_use]
pub fn merge_ids(
    existing: &[String],
    incoming: &[String],
    direction: MergeDirection,
) -> Vec<String> {
    merge_by_key(existing, incoming, direction, Clone::clone)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_empty_existing_returns_incoming_order() {
        let merged = merge_ids(&[], &ids(&["c", "a", "b"]), MergeDirection::Append);
        assert_eq!(merged, ids(&["c", "a", "b"]));
    }

    #[test]
    fn test_empty_incoming_returns_existing() {
        let existing = ids(&["a", "b"]);
        let merged = merge_ids(&existing, &[], MergeDirection::Prepend);
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_disjoint_append_is_concatenation() {
        let merged = merge_ids(
            &ids(&["a", "b", "c"]),
            &ids(&["d", "e"]),
            MergeDirection::Append,
        );
        assert_eq!(merged, ids(&["a", "b", "c", "d", "e"]));
    }

    #[test]
    fn test_disjoint_prepend_is_reverse_concatenation() {
        let merged = merge_ids(
            &ids(&["c", "d"]),
            &ids(&["a", "b"]),
            MergeDirection::Prepend,
        );
        assert_eq!(merged, ids(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_overlap_is_deduplicated() {
        let merged = merge_ids(
            &ids(&["a", "b", "c"]),
            &ids(&["c", "d"]),
            MergeDirection::Append,
        );
        assert_eq!(merged, ids(&["a", "b", "c", "d"]));
    }

    #[test]
    fn test_stale_entry_takes_incoming_position() {
        // "c" and "d" were interleaved around "x" by a previous partial
        // fetch; the fresh page pins them back into server order.
        let merged = merge_ids(
            &ids(&["a", "b", "c", "x", "d"]),
            &ids(&["c", "d", "e"]),
            MergeDirection::Append,
        );
        assert_eq!(merged, ids(&["a", "b", "x", "c", "d", "e"]));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let existing = ids(&["a", "b", "c"]);
        let incoming = ids(&["b", "d"]);

        let once = merge_ids(&existing, &incoming, MergeDirection::Append);
        let twice = merge_ids(&once, &incoming, MergeDirection::Append);
        assert_eq!(once, twice);

        let once = merge_ids(&existing, &incoming, MergeDirection::Prepend);
        let twice = merge_ids(&once, &incoming, MergeDirection::Prepend);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_duplicates_in_output() {
        let merged = merge_ids(
            &ids(&["a", "b", "c", "d"]),
            &ids(&["d", "c", "e"]),
            MergeDirection::Append,
        );
        let unique: std::collections::HashSet<_> = merged.iter().collect();
        assert_eq!(unique.len(), merged.len());
    }

    #[test]
    fn test_record_variant_merges_by_extracted_key() {
        #[derive(Debug, Clone, PartialEq)]
        struct Entry {
            key: String,
            cursor: u32,
        }
        let entry = |key: &str, cursor| Entry {
            key: key.to_string(),
            cursor,
        };

        let existing = vec![entry("a", 1), entry("b", 2)];
        let incoming = vec![entry("b", 7), entry("c", 8)];

        let merged = merge_by_key(&existing, &incoming, MergeDirection::Append, |e| {
            e.key.clone()
        });

        // The refreshed "b" record wins over the stale one.
        assert_eq!(merged, vec![entry("a", 1), entry("b", 7), entry("c", 8)]);
    }
}
