//! Cadastral municipality (KO) name directory.
//!
//! Built once at startup and shared read-only between request handlers.
//! Reference data changes require a restart to be picked up.

use std::collections::BTreeMap;

use crate::{CadastralMunicipality, LayerError, LotStore};

/// Immutable `KO_ID` → name mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KoDirectory {
    names: BTreeMap<i32, String>,
}

impl KoDirectory {
    /// Builds a directory from municipality records. Later duplicates win.
    #[must_use]
    pub fn from_municipalities(
        municipalities: impl IntoIterator<Item = CadastralMunicipality>,
    ) -> Self {
        Self {
            names: municipalities
                .into_iter()
                .map(|ko| (ko.ko_id, ko.name))
                .collect(),
        }
    }

    /// Loads every cadastral municipality from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`LayerError`] if the store query fails.
    pub async fn load(store: &dyn LotStore) -> Result<Self, LayerError> {
        let municipalities = store.cadastral_municipalities().await?;
        let directory = Self::from_municipalities(municipalities);
        log::info!("Loaded {} cadastral municipalities", directory.len());
        Ok(directory)
    }

    /// Name of the municipality with id `ko_id`.
    #[must_use]
    pub fn name(&self, ko_id: i32) -> Option<&str> {
        self.names.get(&ko_id).map(String::as_str)
    }

    /// Number of known municipalities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
