use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    error::AppResult,
    models::{Game, GameData},
    services::{run_query, GameQuery, Page},
};

use super::CatalogStore;

/// Catalog kept in process memory, used when no database is configured
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    games: BTreeMap<i64, Game>,
    last_id: i64,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Game>> {
        let inner = self.inner.read().await;
        Ok(inner.games.values().cloned().collect())
    }

    async fn query(&self, query: &GameQuery) -> AppResult<Page<Game>> {
        let games = self.list().await?;
        Ok(run_query(games, query))
    }

    async fn get(&self, id: i64) -> AppResult<Option<Game>> {
        let inner = self.inner.read().await;
        Ok(inner.games.get(&id).cloned())
    }

    async fn find_by_name(&self, fragment: &str) -> AppResult<Option<Game>> {
        let inner = self.inner.read().await;
        Ok(inner
            .games
            .values()
            .find(|game| game.name_contains(fragment))
            .cloned())
    }

    async fn insert(&self, data: GameData) -> AppResult<Game> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let game = Game::new(inner.last_id, data);
        inner.games.insert(game.id, game.clone());
        Ok(game)
    }

    async fn update(&self, game: Game) -> AppResult<Option<Game>> {
        let mut inner = self.inner.write().await;
        match inner.games.get_mut(&game.id) {
            Some(stored) => {
                *stored = game.clone();
                Ok(Some(game))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.games.remove(&id).is_some())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
