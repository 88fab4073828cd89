//! Per-category change listeners
//!
//! Each category has at most one handler. Handlers run synchronously after
//! the cache mutation and see the cache read-only. Every change is also
//! published on a `watch` channel for async consumers.

use serde::Serialize;
use tokio::sync::watch;
use tracing::trace;

use crate::cache::{BulkOutcome, DataCache};
use crate::types::Category;

/// What happened to a category's cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChangeKind {
    /// Cleared for a new request
    Reset,
    /// Count received; the list is loaded
    Count(usize),
    /// One item written at this index
    Item(usize),
    /// A bulk payload replaced the list
    Bulk(BulkOutcome),
}

/// A cache change, passed to listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataChange {
    pub category: Category,
    pub kind: ChangeKind,
}

impl DataChange {
    pub fn new(category: Category, kind: ChangeKind) -> Self {
        Self { category, kind }
    }
}

/// Listener callback
pub type ChangeHandler = Box<dyn FnMut(&DataChange, &DataCache)>;

/// Listener table, one slot per category
pub struct ListenerRegistry {
    handlers: [Option<ChangeHandler>; 4],
    changes: watch::Sender<Option<DataChange>>,
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered: Vec<Category> = Category::ALL
            .into_iter()
            .filter(|category| self.handlers[category.slot()].is_some())
            .collect();
        f.debug_struct("ListenerRegistry").field("registered", &registered).finish()
    }
}

impl ListenerRegistry {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(None);
        Self { handlers: [None, None, None, None], changes }
    }

    /// Install `handler` for `category`, replacing any previous one
    pub fn set_changed_handler<F>(&mut self, category: Category, handler: F)
    where
        F: FnMut(&DataChange, &DataCache) + 'static,
    {
        self.handlers[category.slot()] = Some(Box::new(handler));
    }

    /// Remove the handler for `category`
    pub fn clear(&mut self, category: Category) {
        self.handlers[category.slot()] = None;
    }

    pub fn is_registered(&self, category: Category) -> bool {
        self.handlers[category.slot()].is_some()
    }

    /// Receiver that sees the latest change of any category
    pub fn subscribe(&self) -> watch::Receiver<Option<DataChange>> {
        self.changes.subscribe()
    }

    /// Call the category's handler once; returns whether one was registered
    pub fn notify(&mut self, change: &DataChange, cache: &DataCache) -> bool {
        self.changes.send_replace(Some(*change));

        match self.handlers[change.category.slot()].as_mut() {
            Some(handler) => {
                trace!(category = %change.category, kind = ?change.kind, "Notifying listener");
                handler(change, cache);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn notify_without_listener_is_a_no_op() {
        let mut registry = ListenerRegistry::new();
        let cache = DataCache::new();
        let change = DataChange::new(Category::Overview, ChangeKind::Reset);
        assert!(!registry.notify(&change, &cache));
    }

    #[test]
    fn handler_runs_once_per_notify() {
        let mut registry = ListenerRegistry::new();
        let cache = DataCache::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        let seen = Rc::clone(&calls);
        registry.set_changed_handler(Category::DriverStandings, move |change, _| {
            seen.borrow_mut().push(*change);
        });

        let change = DataChange::new(Category::DriverStandings, ChangeKind::Count(20));
        assert!(registry.notify(&change, &cache));
        assert!(!registry.notify(&DataChange::new(Category::TeamStandings, ChangeKind::Reset), &cache));

        assert_eq!(calls.borrow().as_slice(), &[change]);
    }

    #[test]
    fn replacing_a_handler_drops_the_old_one() {
        let mut registry = ListenerRegistry::new();
        let cache = DataCache::new();
        let first = Rc::new(RefCell::new(0));
        let second = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&first);
        registry.set_changed_handler(Category::Overview, move |_, _| *counter.borrow_mut() += 1);
        let counter = Rc::clone(&second);
        registry.set_changed_handler(Category::Overview, move |_, _| *counter.borrow_mut() += 1);

        registry.notify(&DataChange::new(Category::Overview, ChangeKind::Item(0)), &cache);
        assert_eq!((*first.borrow(), *second.borrow()), (0, 1));

        registry.clear(Category::Overview);
        assert!(!registry.is_registered(Category::Overview));
    }

    #[test]
    fn handler_reads_the_cache() {
        let mut registry = ListenerRegistry::new();
        let mut cache = DataCache::new();
        cache.load_bulk(Category::TeamStandings, None, "1|McLaren|666\n2|Ferrari|652");

        let total = Rc::new(RefCell::new(0));
        let sum = Rc::clone(&total);
        registry.set_changed_handler(Category::TeamStandings, move |_, cache| {
            *sum.borrow_mut() = cache.team_standings().items().map(|team| team.points).sum();
        });

        registry.notify(&DataChange::new(Category::TeamStandings, ChangeKind::Count(2)), &cache);
        assert_eq!(*total.borrow(), 1318);
    }

    #[test]
    fn subscribers_see_the_latest_change() {
        let mut registry = ListenerRegistry::new();
        let cache = DataCache::new();
        let receiver = registry.subscribe();

        let change = DataChange::new(Category::RaceDetails, ChangeKind::Reset);
        registry.notify(&change, &cache);
        assert_eq!(*receiver.borrow(), Some(change));
    }
}
