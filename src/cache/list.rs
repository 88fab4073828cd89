//! Fixed-capacity list addressed by slot index

use tracing::warn;

/// One category's cached records
///
/// Slots are addressed by index; writes at `index >= N` are dropped. The list
/// is loaded once a count arrives or a bulk payload has been applied.
#[derive(Debug, Clone)]
pub struct CategoryList<T, const N: usize> {
    slots: [Option<T>; N],
    expected: Option<usize>,
    loaded: bool,
}

impl<T, const N: usize> Default for CategoryList<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> CategoryList<T, N> {
    pub const CAPACITY: usize = N;

    pub fn new() -> Self {
        Self { slots: std::array::from_fn(|_| None), expected: None, loaded: false }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    /// Store `item` at `index`; returns `false` (and drops it) when out of range
    pub fn set(&mut self, index: usize, item: T) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) => {
                *slot = Some(item);
                true
            }
            None => false,
        }
    }

    /// Clear one slot, returning what it held
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Filled slots in index order
    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(Option::as_ref)
    }

    /// Number of filled slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Expected size announced by the phone, if any
    pub fn expected(&self) -> Option<usize> {
        self.expected
    }

    /// Expected size when announced, otherwise the number of filled slots
    pub fn count(&self) -> usize {
        self.expected.unwrap_or_else(|| self.len())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Record the expected size and mark the list loaded
    ///
    /// Counts above capacity are clamped.
    pub fn set_count(&mut self, count: usize) -> usize {
        let clamped = count.min(N);
        if clamped != count {
            warn!(count, capacity = N, "Count exceeds list capacity, clamping");
        }
        self.expected = Some(clamped);
        self.loaded = true;
        clamped
    }

    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Replace the whole list with `items` in order
    ///
    /// Items past capacity are dropped. The list is loaded afterwards, with
    /// its count equal to the number stored. Returns (stored, dropped).
    pub fn replace_all<I>(&mut self, items: I) -> (usize, usize)
    where
        I: IntoIterator<Item = T>,
    {
        self.reset();
        let mut stored = 0;
        let mut dropped = 0;
        for item in items {
            if self.set(stored, item) {
                stored += 1;
            } else {
                dropped += 1;
            }
        }
        self.expected = Some(stored);
        self.loaded = true;
        (stored, dropped)
    }

    /// Drop every item and the loaded state
    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.expected = None;
        self.loaded = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_list_is_empty_and_unloaded() {
        let list: CategoryList<u32, 4> = CategoryList::new();
        assert!(list.is_empty());
        assert!(!list.is_loaded());
        assert_eq!(list.count(), 0);
        assert_eq!(list.capacity(), 4);
        assert_eq!(CategoryList::<u32, 4>::CAPACITY, 4);
    }

    #[test]
    fn out_of_range_writes_are_dropped() {
        let mut list: CategoryList<u32, 4> = CategoryList::new();
        assert!(list.set(3, 30));
        assert!(!list.set(4, 40));
        assert!(!list.set(usize::MAX, 50));
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec![30]);
    }

    #[test]
    fn items_skip_holes_in_index_order() {
        let mut list: CategoryList<&str, 5> = CategoryList::new();
        list.set(3, "d");
        list.set(0, "a");
        list.set(1, "b");
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec!["a", "b", "d"]);
        assert_eq!(list.len(), 3);
        assert_eq!(list.remove(1), Some("b"));
        assert_eq!(list.remove(1), None);
    }

    #[test]
    fn count_marks_loaded_and_clamps() {
        let mut list: CategoryList<u32, 4> = CategoryList::new();
        assert_eq!(list.set_count(2), 2);
        assert!(list.is_loaded());
        assert_eq!(list.count(), 2);

        assert_eq!(list.set_count(10), 4);
        assert_eq!(list.expected(), Some(4));
    }

    #[test]
    fn replace_all_reports_drops() {
        let mut list: CategoryList<u32, 3> = CategoryList::new();
        list.set(2, 99);
        let (stored, dropped) = list.replace_all(vec![1, 2, 3, 4, 5]);
        assert_eq!((stored, dropped), (3, 2));
        assert_eq!(list.items().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(list.is_loaded());
        assert_eq!(list.count(), 3);
    }

    #[test]
    fn reset_clears_everything() {
        let mut list: CategoryList<u32, 3> = CategoryList::new();
        list.set(0, 1);
        list.set_count(1);
        list.reset();
        assert!(list.is_empty());
        assert!(!list.is_loaded());
        assert_eq!(list.expected(), None);
    }

    proptest! {
        #[test]
        fn write_then_read_returns_the_item(index in 0usize..30, value in any::<u32>()) {
            let mut list: CategoryList<u32, 30> = CategoryList::new();
            prop_assert!(list.set(index, value));
            prop_assert_eq!(list.get(index), Some(&value));
        }

        #[test]
        fn writes_past_capacity_leave_state_unchanged(
            filled in prop::collection::vec((0usize..10, any::<u32>()), 0..10),
            index in 10usize..1000,
            value in any::<u32>(),
        ) {
            let mut list: CategoryList<u32, 10> = CategoryList::new();
            for (i, v) in filled {
                list.set(i, v);
            }
            let before: Vec<u32> = list.items().copied().collect();
            prop_assert!(!list.set(index, value));
            let after: Vec<u32> = list.items().copied().collect();
            prop_assert_eq!(before, after);
        }
    }
}
