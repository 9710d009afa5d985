use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A densely-interpolable position identifier, ordered by `path` first,
/// then path length (a strict prefix is less than the longer path it
/// prefixes), then `(site, counter)` as a final tiebreak.
///
/// `path` is compared element by element; once the shorter of the two is
/// exhausted without a difference, the shorter path sorts first — this
/// matters for allocator-produced children: descending into an adjacent
/// digit gap mints a longer path that must still sort after its own left
/// neighbour's shorter prefix regardless of which site minted it. Only once
/// both paths are equal does the comparison fall through to `site` then
/// `counter`.
///
/// `BEGIN` and `END` (see [`PositionId::begin`]/[`PositionId::end`]) both use
/// an empty `path`, so they compare equal to each other under this `Ord` —
/// they are never stored or compared directly against one another. Their
/// ordering relative to real PIDs is enforced structurally by the allocator
/// (which treats a missing digit on the `left` side as `MIN` and on the
/// `right` side as `MAX`), not by calling `cmp` on the sentinel itself.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PositionId {
    pub path: Vec<u32>,
    pub site: String,
    pub counter: u64,
}

impl PositionId {
    pub fn new(path: Vec<u32>, site: impl Into<String>, counter: u64) -> Self {
        Self {
            path,
            site: site.into(),
            counter,
        }
    }

    /// The sentinel denoting "before the first character".
    pub fn begin() -> Self {
        Self {
            path: Vec::new(),
            site: String::new(),
            counter: 0,
        }
    }

    /// The sentinel denoting "after the last character".
    pub fn end() -> Self {
        Self {
            path: Vec::new(),
            site: String::new(),
            counter: 0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.path.is_empty()
    }
}

impl Ord for PositionId {
    fn cmp(&self, other: &Self) -> Ordering {
        let min_len = self.path.len().min(other.path.len());
        for i in 0..min_len {
            let ord = self.path[i].cmp(&other.path[i]);
            if ord != Ordering::Equal {
                return ord;
            }
        }

        // One path is a strict prefix of the other (or they're equal length
        // and equal so far): the shorter path is less (spec §3). Only once
        // lengths also match do site/counter break the tie.
        self.path
            .len()
            .cmp(&other.path.len())
            .then_with(|| self.site.cmp(&other.site))
            .then_with(|| self.counter.cmp(&other.counter))
    }
}

impl PartialOrd for PositionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_and_end_are_indistinguishable_as_bare_values() {
        // Both sentinels share the same empty-path, empty-site, zero-counter
        // representation. They are only ever used in their positional role
        // (as the `left` or `right` argument to the allocator), never
        // compared against each other directly.
        assert_eq!(PositionId::begin(), PositionId::end());
    }

    #[test]
    fn differing_first_digit_decides_order_regardless_of_site() {
        let lower = PositionId::new(vec![3], "Z", 99);
        let higher = PositionId::new(vec![4], "A", 1);
        assert!(lower < higher);
    }

    #[test]
    fn a_strict_prefix_is_less_regardless_of_site() {
        // Same path prefix, minted by a later call with a fresh counter --
        // the realistic way a shorter and a longer path ever share a prefix.
        let short = PositionId::new(vec![3], "A", 1);
        let long = PositionId::new(vec![3, 1], "A", 2);
        assert!(short < long);
    }

    #[test]
    fn a_descended_child_still_sorts_after_its_shorter_left_neighbour_even_with_an_earlier_site() {
        // Regression: descending into an adjacent digit gap mints a longer
        // path whose site can sort earlier than the left neighbour's site
        // ("A" < "Z"). Length must be checked before site/counter, or the
        // freshly minted child would sort before its own left neighbour.
        let left = PositionId::new(vec![3], "Z", 1);
        let child = PositionId::new(vec![3, 5], "A", 2);
        assert!(left < child);
    }

    #[test]
    fn site_breaks_ties_on_equal_path() {
        let a = PositionId::new(vec![3], "A", 1);
        let b = PositionId::new(vec![3], "B", 1);
        assert!(a < b);
    }

    #[test]
    fn counter_breaks_ties_on_equal_path_and_site() {
        let a = PositionId::new(vec![3], "A", 1);
        let b = PositionId::new(vec![3], "A", 2);
        assert!(a < b);
    }
}
