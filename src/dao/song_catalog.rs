use std::{collections::HashMap, sync::Arc};

use futures::future::{self, BoxFuture};

use crate::{
    config::AppConfig,
    dao::{models::SongEntity, storage::StorageResult},
    state::SongId,
};

/// Lookup of song metadata by identifier.
pub trait SongCatalog: Send + Sync {
    fn find_song(&self, id: SongId) -> BoxFuture<'static, StorageResult<Option<SongEntity>>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}

/// Catalog held entirely in memory, seeded at startup.
#[derive(Debug, Default, Clone)]
pub struct InMemorySongCatalog {
    songs: Arc<HashMap<SongId, SongEntity>>,
}

impl InMemorySongCatalog {
    /// Build a catalog from a list of songs; later duplicates win.
    pub fn from_songs(songs: impl IntoIterator<Item = SongEntity>) -> Self {
        let songs = songs.into_iter().map(|song| (song.id, song)).collect();
        Self {
            songs: Arc::new(songs),
        }
    }

    /// Build a catalog from the songs listed in the configuration.
    pub fn from_config(config: &AppConfig) -> Self {
        Self::from_songs(config.songs().iter().cloned())
    }

    /// Number of songs known to the catalog.
    pub fn len(&self) -> usize {
        self.songs.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }
}

impl SongCatalog for InMemorySongCatalog {
    fn find_song(&self, id: SongId) -> BoxFuture<'static, StorageResult<Option<SongEntity>>> {
        let song = self.songs.get(&id).cloned();
        Box::pin(future::ready(Ok(song)))
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(future::ready(Ok(())))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: SongId, title: &str) -> SongEntity {
        SongEntity {
            id,
            title: title.into(),
            difficulty: "normal".into(),
            length_seconds: 120,
            cover: format!("covers/{id}.png"),
        }
    }

    #[tokio::test]
    async fn finds_songs_by_id() {
        let catalog = InMemorySongCatalog::from_songs([song(1, "Glow"), song(2, "Pulse")]);

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.find_song(2).await.unwrap().unwrap().title, "Pulse");
        assert!(catalog.find_song(9).await.unwrap().is_none());
        assert!(catalog.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn seeded_from_default_config() {
        let catalog = InMemorySongCatalog::from_config(&AppConfig::default());
        assert!(!catalog.is_empty());
        assert!(catalog.find_song(1).await.unwrap().is_some());
    }
}
