use crate::{
    error::AppResult,
    models::{Game, GameData},
    services::{GameQuery, Page},
};

/// Persistence abstraction for catalog records
///
/// Implementations return games in ascending id order wherever more than one
/// record comes back, and a name lookup returns the first match in that order.
/// The query pipeline and the recommender rely on this ordering.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every game in the catalog, ordered by id
    async fn list(&self) -> AppResult<Vec<Game>>;

    /// One page of the games matching `query`, plus the size of the match set.
    ///
    /// Must agree with [`crate::services::run_query`] over [`CatalogStore::list`].
    async fn query(&self, query: &GameQuery) -> AppResult<Page<Game>>;

    async fn get(&self, id: i64) -> AppResult<Option<Game>>;

    /// First game whose name contains `fragment`, ignoring case
    async fn find_by_name(&self, fragment: &str) -> AppResult<Option<Game>>;

    /// Stores a new game and assigns its id
    async fn insert(&self, data: GameData) -> AppResult<Game>;

    /// Replaces a stored game, returning `None` if it no longer exists
    async fn update(&self, game: Game) -> AppResult<Option<Game>>;

    /// Removes a game and its associations, reporting whether it existed
    async fn delete(&self, id: i64) -> AppResult<bool>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
