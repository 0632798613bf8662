//! Atomically swappable dataset handle.
//!
//! Readers take an [`Arc`] snapshot with [`DatasetHandle::current`] and keep
//! using it for the duration of a request. [`DatasetHandle::reload`] builds
//! the replacement dataset without holding the lock and swaps it in as a
//! single pointer update, so a reader sees either the old dataset or the new
//! one, never a mix.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::{Dataset, DatasetError, LoadOptions, load_with};

/// Shared handle to the current [`Dataset`].
pub struct DatasetHandle {
    source: PathBuf,
    options: LoadOptions,
    current: RwLock<Arc<Dataset>>,
}

impl DatasetHandle {
    /// Loads the dataset at `source` and wraps it in a handle.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the initial load fails.
    pub fn open(source: &Path, options: LoadOptions) -> Result<Self, DatasetError> {
        let dataset = load_with(source, options)?;
        Ok(Self::from_dataset(source, options, dataset))
    }

    /// Wraps an already-loaded dataset.
    #[must_use]
    pub fn from_dataset(source: &Path, options: LoadOptions, dataset: Dataset) -> Self {
        Self {
            source: source.to_path_buf(),
            options,
            current: RwLock::new(Arc::new(dataset)),
        }
    }

    /// Path of the source extract.
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The dataset currently being served.
    #[must_use]
    pub fn current(&self) -> Arc<Dataset> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Reloads the dataset from its source and swaps it in.
    ///
    /// On failure the previous dataset keeps being served.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the reload fails.
    pub fn reload(&self) -> Result<Arc<Dataset>, DatasetError> {
        let fresh = Arc::new(load_with(&self.source, self.options)?);
        Ok(self.replace(fresh))
    }

    /// Swaps in `dataset` and returns it.
    pub fn replace(&self, dataset: Arc<Dataset>) -> Arc<Dataset> {
        {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            *guard = Arc::clone(&dataset);
        }
        log::info!(
            "Swapped in dataset with {} rows, {} establishments",
            dataset.len(),
            dataset.establishment_count()
        );
        dataset
    }
}
