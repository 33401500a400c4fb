use thiserror::Error;

use super::asset::{AssetDescriptor, AssetKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    #[error("{kind} `{name}` is not part of the collection")]
    NotFound { kind: AssetKind, name: String },
}

/// Ordered descriptors of a single asset kind.
///
/// Invalid descriptors never make it in: [`AssetCollection::add`] logs them and
/// hands them back to the caller instead of failing, so one bad entry in a
/// configuration file cannot abort loading the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCollection {
    kind: AssetKind,
    entries: Vec<AssetDescriptor>,
}

impl AssetCollection {
    pub fn new(kind: AssetKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    /// Builds a collection from structural data, returning the rejected entries
    /// alongside it.
    pub fn from_descriptors<I>(kind: AssetKind, descriptors: I) -> (Self, Vec<AssetDescriptor>)
    where
        I: IntoIterator<Item = AssetDescriptor>,
    {
        let mut collection = Self::new(kind);
        let rejected = collection.add_many(descriptors);
        (collection, rejected)
    }

    #[must_use]
    pub fn kind(&self) -> AssetKind {
        self.kind
    }

    pub fn entries(&self) -> &[AssetDescriptor] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &AssetDescriptor> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Appends the descriptor when it is valid. Returns whether it was kept.
    pub fn add(&mut self, descriptor: AssetDescriptor) -> bool {
        if descriptor.is_valid() {
            self.entries.push(descriptor);
            true
        } else {
            tracing::warn!(
                kind = %self.kind,
                name = %descriptor.name,
                url = %descriptor.url,
                "Invalid {} entry, skipping",
                self.kind
            );
            false
        }
    }

    pub fn add_many<I>(&mut self, descriptors: I) -> Vec<AssetDescriptor>
    where
        I: IntoIterator<Item = AssetDescriptor>,
    {
        let mut rejected = Vec::new();
        for descriptor in descriptors {
            if !descriptor.is_valid() {
                rejected.push(descriptor.clone());
            }
            self.add(descriptor);
        }
        rejected
    }

    /// Removes the first entry equal to `descriptor`.
    pub fn remove(&mut self, descriptor: &AssetDescriptor) -> Result<(), CollectionError> {
        let position = self
            .entries
            .iter()
            .position(|current| current == descriptor)
            .ok_or_else(|| CollectionError::NotFound {
                kind: self.kind,
                name: descriptor.name.clone(),
            })?;
        self.entries.remove(position);
        Ok(())
    }

    /// Removes each descriptor in turn, stopping at the first one that is
    /// missing. Removals made before the failure are kept.
    pub fn remove_many<'a, I>(&mut self, descriptors: I) -> Result<(), CollectionError>
    where
        I: IntoIterator<Item = &'a AssetDescriptor>,
    {
        for descriptor in descriptors {
            self.remove(descriptor)?;
        }
        Ok(())
    }

    pub fn to_descriptors(&self) -> Vec<AssetDescriptor> {
        self.entries.clone()
    }
}

impl<'a> IntoIterator for &'a AssetCollection {
    type Item = &'a AssetDescriptor;
    type IntoIter = std::slice::Iter<'a, AssetDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
