//! Contract between the world and the producers of terrain columns.

use std::rc::Rc;

use thiserror::Error;

use crate::{catalog::CatalogError, fields::FieldError, tile::Tile};

/// Version stamp of a configuration; any change invalidates derived data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Wraps a raw digest.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw digest value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Configuration whose content can be summarised by a fingerprint.
pub trait Configuration {
    /// Fingerprint of the current configuration content.
    fn fingerprint(&self) -> Fingerprint;
}

/// Errors raised while producing a column.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// A catalog lookup made by the generator failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    /// A generated tile rejected its fields.
    #[error(transparent)]
    Field(#[from] FieldError),
    /// The configuration cannot produce a valid column.
    #[error("invalid generator configuration: {reason}")]
    InvalidConfiguration {
        /// Human readable explanation.
        reason: String,
    },
}

/// Produces the tiles of a column, bottom row first.
///
/// Implementations are expected to return exactly [`crate::WORLD_ROWS`] tiles
/// whose positions match `(index, row)`. Tiles are shared so callers can keep
/// them without copying; mutate through [`Rc::make_mut`].
pub trait ColumnGenerator {
    /// Fingerprint of the configuration the generator currently uses.
    fn fingerprint(&self) -> Fingerprint;

    /// Tiles of the column at `index`.
    fn column(&mut self, index: i32) -> Result<&[Rc<Tile>], GenerationError>;
}

impl<G: ColumnGenerator + ?Sized> ColumnGenerator for Box<G> {
    fn fingerprint(&self) -> Fingerprint {
        (**self).fingerprint()
    }

    fn column(&mut self, index: i32) -> Result<&[Rc<Tile>], GenerationError> {
        (**self).column(index)
    }
}

#[cfg(test)]
mod tests {
    use super::GenerationError;
    use crate::catalog::CatalogError;

    #[test]
    fn catalog_errors_keep_their_kind() {
        let unknown = CatalogError::UnknownTileType {
            key: "classic:lava".to_owned(),
        };
        let error = GenerationError::from(unknown.clone());
        assert_eq!(error, GenerationError::Catalog(unknown.clone()));
        assert_eq!(error.to_string(), unknown.to_string());

        let duplicate = CatalogError::DuplicateType {
            key: "classic:stone",
        };
        assert_eq!(
            GenerationError::from(duplicate.clone()),
            GenerationError::Catalog(duplicate)
        );
    }
}
