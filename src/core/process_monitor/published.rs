//! The presentation-side copy of the process list.
//!
//! The refresh pipeline never touches this directly: it sends `ListUpdate`
//! batches, and whoever owns the `PublishedList` (normally the UI thread)
//! applies them in order.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::RwLock;

use super::model::ProcessRecord;

/// A cached process record shared between the pipeline's cache and the
/// published list. Persisting pids keep the same allocation across refreshes.
pub type SharedRecord = Arc<RwLock<ProcessRecord>>;

/// One ordered batch of list changes: apply `removed`, then append `added`.
#[derive(Debug, Clone, Default)]
pub struct ListUpdate {
    pub removed: Vec<u32>,
    pub added: Vec<SharedRecord>,
}

impl ListUpdate {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn added_pids(&self) -> Vec<u32> {
        self.added.iter().map(|r| r.read().pid).collect()
    }
}

/// Selection outcome of applying an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// Nothing was selected before or after.
    None,
    /// The selected pid survived and is selected again.
    Reaffirmed(u32),
    /// The selected pid left the list; selection is now empty.
    Cleared(u32),
}

#[derive(Debug, Default)]
pub struct PublishedList {
    items: Vec<SharedRecord>,
    selected: Option<SharedRecord>,
}

impl PublishedList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove, then append. Untouched entries keep their position and identity.
    pub fn apply(&mut self, update: ListUpdate) -> SelectionChange {
        if !update.removed.is_empty() {
            let removed: HashSet<u32> = update.removed.iter().copied().collect();
            self.items.retain(|item| !removed.contains(&item.read().pid));
        }

        for added in update.added {
            let pid = added.read().pid;
            if !self.contains(pid) {
                self.items.push(added);
            }
        }

        self.reaffirm_selection()
    }

    fn reaffirm_selection(&mut self) -> SelectionChange {
        let Some(previous) = self.selected.take() else {
            return SelectionChange::None;
        };

        let pid = previous.read().pid;
        match self.position(pid) {
            Some(index) => {
                self.selected = Some(Arc::clone(&self.items[index]));
                SelectionChange::Reaffirmed(pid)
            }
            None => SelectionChange::Cleared(pid),
        }
    }

    pub fn select(&mut self, pid: u32) -> bool {
        self.selected = self.position(pid).map(|i| Arc::clone(&self.items[i]));
        self.selected.is_some()
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        self.selected = self.items.get(index).cloned();
        self.selected.is_some()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&SharedRecord> {
        self.selected.as_ref()
    }

    pub fn selected_pid(&self) -> Option<u32> {
        self.selected.as_ref().map(|r| r.read().pid)
    }

    pub fn selected_index(&self) -> Option<usize> {
        let selected = self.selected.as_ref()?;
        self.items.iter().position(|item| Arc::ptr_eq(item, selected))
    }

    pub fn position(&self, pid: u32) -> Option<usize> {
        self.items.iter().position(|item| item.read().pid == pid)
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.position(pid).is_some()
    }

    pub fn items(&self) -> &[SharedRecord] {
        &self.items
    }

    pub fn pids(&self) -> Vec<u32> {
        self.items.iter().map(|r| r.read().pid).collect()
    }

    /// Point-in-time copies of every row, for rendering.
    pub fn rows(&self) -> Vec<ProcessRecord> {
        self.items.iter().map(|r| r.read().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
