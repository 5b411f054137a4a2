//! Fixed-capacity observer registry.
//!
//! Sources and recorders are registered by reference. The registry never owns the
//! referenced component, so removing an entry never tears anything down: the caller gets the
//! reference back. Entries keep their registration order, and removal closes the gap.

use heapless::Vec;

use crate::error::RegistryError;

/// An ordered list of at most `N` entries.
#[derive(Debug)]
pub struct Registry<T, const N: usize> {
    entries: Vec<T, N>,
}

impl<T, const N: usize> Registry<T, N> {
    /// Creates an empty registry.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends `entry`.
    ///
    /// # Errors
    /// [`RegistryError::Full`] if all `N` slots are taken. The registry is unchanged and the
    /// entry is dropped, which for a reference means nothing happens to the component.
    pub fn add(&mut self, entry: T) -> Result<(), RegistryError> {
        self.entries.push(entry).map_err(|_| {
            warn!("registry: full ({} entries)", N);
            RegistryError::Full { capacity: N }
        })
    }

    /// Removes the first entry matching `pred` and returns it.
    ///
    /// Later entries move up by one, keeping their relative order.
    pub fn remove_where(&mut self, pred: impl FnMut(&T) -> bool) -> Option<T> {
        let index = self.entries.iter().position(pred)?;
        Some(self.entries.remove(index))
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Compile-time capacity.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Entries in registration order.
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.entries.iter()
    }

    /// Entries in registration order, mutably.
    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.entries.iter_mut()
    }
}

impl<T, const N: usize> Default for Registry<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
