//! Iterator utilities.

use std::collections::HashSet;
use std::hash::Hash;

/// Extends a collection with only the items it does not already contain.
///
/// Insertion order is preserved: existing items keep their position and new items are appended
/// in the order the iterator yields them. An item repeated within the iterator is only added
/// once.
pub trait ExtendUnique<T> {
    /// Appends every item from `iter` that is not already present, returns how many were added.
    fn extend_unique<I: IntoIterator<Item = T>>(&mut self, iter: I) -> usize;
}

impl<T: Clone + Eq + Hash> ExtendUnique<T> for Vec<T> {
    fn extend_unique<I: IntoIterator<Item = T>>(&mut self, iter: I) -> usize {
        let mut seen: HashSet<T> = self.iter().cloned().collect();
        let before = self.len();
        for item in iter {
            if seen.insert(item.clone()) {
                self.push(item);
            }
        }
        self.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_extend_unique() {
        let mut items = vec!["a", "b"];
        let added = items.extend_unique(["b", "c", "a", "d", "c"]);
        assert_eq!(added, 2);
        assert_eq!(items, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn smoketest_extend_unique_keeps_existing_duplicates() {
        // Items already in the collection are never removed, even if duplicated.
        let mut items = vec![1, 1, 2];
        items.extend_unique([2, 3]);
        assert_eq!(items, vec![1, 1, 2, 3]);
    }
}
