//! Live threads, indexed by id and grouped per page in creation order.
//!
//! Page order matters: click dispatch walks a page's threads front to back
//! and the first hit wins. While a dispatch is walking a page, inserts and
//! removals are queued and applied by [`ThreadRegistry::end_dispatch`] so the
//! walk never sees the list change underneath it.

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::ThreadId;
use crate::thread::Thread;

#[derive(Debug)]
enum Queued {
    Insert(Box<Thread>),
    Remove(ThreadId),
}

/// In-memory store of live threads.
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: HashMap<ThreadId, Thread>,
    pages: BTreeMap<u32, Vec<ThreadId>>,
    dispatch_depth: usize,
    queued: Vec<Queued>,
}

impl ThreadRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a thread at the end of its page. Replaces a thread with the same id.
    pub fn insert(&mut self, thread: Thread) {
        if self.dispatch_depth > 0 {
            self.queued.push(Queued::Insert(Box::new(thread)));
            return;
        }
        self.insert_now(thread);
    }

    fn insert_now(&mut self, thread: Thread) {
        let id = thread.id();
        let page = thread.page();
        if let Some(old) = self.threads.insert(id, thread) {
            self.unlink(old.page(), id);
        }
        self.pages.entry(page).or_default().push(id);
    }

    /// Remove a thread. During a dispatch the removal is deferred and `None`
    /// is returned; the thread stays reachable until the dispatch ends.
    pub fn remove(&mut self, id: ThreadId) -> Option<Thread> {
        if self.dispatch_depth > 0 {
            self.queued.push(Queued::Remove(id));
            return None;
        }
        self.remove_now(id)
    }

    fn remove_now(&mut self, id: ThreadId) -> Option<Thread> {
        let thread = self.threads.remove(&id)?;
        self.unlink(thread.page(), id);
        Some(thread)
    }

    fn unlink(&mut self, page: u32, id: ThreadId) {
        if let Some(ids) = self.pages.get_mut(&page) {
            ids.retain(|t| *t != id);
            if ids.is_empty() {
                self.pages.remove(&page);
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.get(&id)
    }

    pub fn get_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.get_mut(&id)
    }

    /// Ids on `page`, in creation order. A snapshot, safe to hold while
    /// mutating threads.
    #[must_use]
    pub fn page_ids(&self, page: u32) -> Vec<ThreadId> {
        self.pages.get(&page).cloned().unwrap_or_default()
    }

    /// Threads on `page`, in creation order.
    pub fn on_page(&self, page: u32) -> impl Iterator<Item = &Thread> {
        self.pages.get(&page).into_iter().flatten().filter_map(|id| self.threads.get(id))
    }

    #[must_use]
    pub fn any_on_page<F>(&self, page: u32, pred: F) -> bool
    where
        F: FnMut(&Thread) -> bool,
    {
        self.on_page(page).any(pred)
    }

    /// Pages that hold at least one thread.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.pages.keys().copied()
    }

    pub fn threads(&self) -> impl Iterator<Item = &Thread> {
        self.threads.values()
    }

    /// Drop every thread on `page` and return them in page order.
    pub fn clear_page(&mut self, page: u32) -> Vec<Thread> {
        let ids = self.pages.remove(&page).unwrap_or_default();
        debug!(page, count = ids.len(), "page threads discarded");
        ids.into_iter().filter_map(|id| self.threads.remove(&id)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Start walking a page. Nested calls are counted.
    pub fn begin_dispatch(&mut self) {
        self.dispatch_depth += 1;
    }

    /// Finish walking. The outermost call flushes queued inserts and
    /// removals in the order they were requested.
    pub fn end_dispatch(&mut self) {
        self.dispatch_depth = self.dispatch_depth.saturating_sub(1);
        if self.dispatch_depth > 0 {
            return;
        }
        for op in std::mem::take(&mut self.queued) {
            match op {
                Queued::Insert(thread) => self.insert_now(*thread),
                Queued::Remove(id) => {
                    self.remove_now(id);
                }
            }
        }
    }
}
