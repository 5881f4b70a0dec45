use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Kind of title a favorite points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Tv,
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaType::Movie => write!(f, "movie"),
            MediaType::Tv => write!(f, "tv"),
        }
    }
}

impl FromStr for MediaType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "movie" => Ok(MediaType::Movie),
            "tv" => Ok(MediaType::Tv),
            other => Err(AppError::InvalidInput(format!(
                "Unknown media type '{}', expected 'movie' or 'tv'",
                other
            ))),
        }
    }
}

/// Identity of a favorite.
///
/// Provider ids are only unique per media type: a movie and a show may share
/// the same numeric id, so both parts are required.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteKey {
    pub id: i64,
    pub media_type: MediaType,
}

impl FavoriteKey {
    pub fn new(id: i64, media_type: MediaType) -> Self {
        Self { id, media_type }
    }
}

impl Display for FavoriteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.media_type, self.id)
    }
}

/// A movie or show the user marked as favorite
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteItem {
    pub id: i64,
    pub media_type: MediaType,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
}

impl FavoriteItem {
    pub fn new(id: i64, media_type: MediaType, title: impl Into<String>) -> Self {
        Self {
            id,
            media_type,
            title: title.into(),
            poster_path: None,
        }
    }

    pub fn with_poster(mut self, poster_path: impl Into<String>) -> Self {
        self.poster_path = Some(poster_path.into());
        self
    }

    pub fn key(&self) -> FavoriteKey {
        FavoriteKey::new(self.id, self.media_type)
    }
}

/// Ordered favorites, unique by [`FavoriteKey`], insertion order preserved
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct FavoritesCollection {
    items: Vec<FavoriteItem>,
}

impl FavoritesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &FavoriteKey) -> bool {
        self.items.iter().any(|item| item.key() == *key)
    }

    pub fn position(&self, key: &FavoriteKey) -> Option<usize> {
        self.items.iter().position(|item| item.key() == *key)
    }

    /// Appends the item unless one with the same key is already present.
    /// Returns whether the collection changed.
    pub fn insert(&mut self, item: FavoriteItem) -> bool {
        if self.contains(&item.key()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Puts an item back at its previous index (clamped to the current length)
    pub fn restore(&mut self, index: usize, item: FavoriteItem) {
        if self.contains(&item.key()) {
            return;
        }
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    /// Removes the item with the given key, returning it with its former index
    pub fn remove(&mut self, key: &FavoriteKey) -> Option<(usize, FavoriteItem)> {
        let index = self.position(key)?;
        Some((index, self.items.remove(index)))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FavoriteItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[FavoriteItem] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<FavoriteItem> {
        self.items
    }
}

impl From<Vec<FavoriteItem>> for FavoritesCollection {
    /// Keeps the first occurrence of each key
    fn from(items: Vec<FavoriteItem>) -> Self {
        let mut collection = Self::new();
        for item in items {
            collection.insert(item);
        }
        collection
    }
}
