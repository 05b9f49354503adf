//! Allow-lists for approved provider hashes and currencies.

use crate::error::{Error, Result};
use std::fmt::Display;

/// Insertion-ordered set with strict add/remove semantics.
///
/// Adding a present value or removing an absent one is an error, so every
/// administrative call changes state exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList<T> {
    label: &'static str,
    items: Vec<T>,
}

impl<T: PartialEq + Copy + Display> AllowList<T> {
    /// Create an empty list. `label` names the entries in error messages.
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self {
            label,
            items: Vec::new(),
        }
    }

    /// Add `item`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if it is already present.
    pub fn add(&mut self, item: T) -> Result<()> {
        if self.contains(&item) {
            return Err(Error::Config(format!("{} {item} already added", self.label)));
        }
        self.items.push(item);
        Ok(())
    }

    /// Remove `item`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if it is not present.
    pub fn remove(&mut self, item: &T) -> Result<()> {
        let index = self
            .items
            .iter()
            .position(|i| i == item)
            .ok_or_else(|| Error::Config(format!("{} {item} not found", self.label)))?;
        self.items.remove(index);
        Ok(())
    }

    /// Whether `item` is present.
    #[must_use]
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<T> {
        self.items.clone()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
