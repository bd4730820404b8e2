//! Undo/redo history of committed strokes.

#[cfg(test)]
#[path = "strokes_test.rs"]
mod strokes_test;

use crate::path::{BoundingBox, DrawingPath};

/// Two stacks: live items, and items undone since the last insert.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStack<T> {
    undo_stack: Vec<T>,
    redo_stack: Vec<T>,
}

impl<T> Default for StrokeStack<T> {
    fn default() -> Self {
        Self { undo_stack: Vec::new(), redo_stack: Vec::new() }
    }
}

impl<T> StrokeStack<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new item. Anything previously undone is discarded.
    pub fn insert(&mut self, item: T) {
        self.undo_stack.push(item);
        self.redo_stack.clear();
    }

    /// Move the newest item to the redo stack. Returns false when empty.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop() {
            Some(item) => {
                self.redo_stack.push(item);
                true
            }
            None => false,
        }
    }

    /// Restore the most recently undone item. Returns false when none.
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(item) => {
                self.undo_stack.push(item);
                true
            }
            None => false,
        }
    }

    /// `(undo depth, redo depth)`.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        (self.undo_stack.len(), self.redo_stack.len())
    }

    /// Live items, oldest first.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.undo_stack
    }

    pub fn apply_to_items<F>(&mut self, mut f: F, include_redo: bool)
    where
        F: FnMut(&mut T),
    {
        self.undo_stack.iter_mut().for_each(&mut f);
        if include_redo {
            self.redo_stack.iter_mut().for_each(&mut f);
        }
    }

    /// True when nothing is live, even if there is redo history.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undo_stack.is_empty()
    }
}

impl StrokeStack<DrawingPath> {
    /// Union of the live paths' bounds.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        self.undo_stack.iter().fold(BoundingBox::EMPTY, |acc, p| DrawingPath::merge(p, acc))
    }
}
