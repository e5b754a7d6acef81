use std::sync::Arc;

use serde::Deserialize;

use crate::{
    db::CatalogStore,
    error::{AppError, AppResult},
    models::{Game, GamePatch, NewGame},
};

use super::{
    query::{GameQuery, ListQuery, Page},
    recommendations::{rank_similar, Recommendation, RECOMMENDATION_LIMIT},
};

const NOT_FOUND_MESSAGE: &str = "Game does not exist";

/// Identifies one game by `id` or by a fragment of its `name`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameSelector {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// The value as sent, unless it is missing or only whitespace
fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl GameSelector {
    pub fn by_id(id: i64) -> Self {
        Self {
            id: Some(id.to_string()),
            name: None,
        }
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }
}

/// Catalog operations on top of a record store
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Filtered, sorted and paginated listing
    pub async fn list(&self, query: &ListQuery) -> AppResult<Page<Game>> {
        self.store.query(&GameQuery::from_params(query)).await
    }

    /// Resolves a selector to a single game.
    ///
    /// An id wins over a name. A name matches case-insensitively as a
    /// substring, and the lowest-id match is returned when several games fit.
    pub async fn find(&self, selector: &GameSelector) -> AppResult<Game> {
        let game = if let Some(raw_id) = non_blank(&selector.id) {
            match raw_id.trim().parse::<i64>() {
                Ok(id) => self.store.get(id).await?,
                Err(_) => None,
            }
        } else if let Some(name) = non_blank(&selector.name) {
            self.store.find_by_name(name).await?
        } else {
            return Err(AppError::MissingSelector);
        };

        game.ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))
    }

    /// Up to five games most similar to the selected one
    pub async fn recommend(&self, selector: &GameSelector) -> AppResult<Recommendation> {
        let reference = self.find(selector).await?;
        let catalog = self.store.list().await?;
        let candidates = catalog.len();

        let recommended_games = rank_similar(&reference, catalog, RECOMMENDATION_LIMIT);
        tracing::info!(
            game_id = reference.id,
            candidates,
            recommended = recommended_games.len(),
            "Computed recommendations"
        );

        Ok(Recommendation {
            reference_game: reference,
            recommended_games,
        })
    }

    pub async fn create(&self, payload: NewGame) -> AppResult<Game> {
        let data = payload.into_data()?;
        let game = self.store.insert(data).await?;
        tracing::info!(game_id = game.id, name = %game.data.name, "Created game");
        Ok(game)
    }

    /// Merges `patch` into the selected game
    pub async fn update(&self, selector: &GameSelector, patch: GamePatch) -> AppResult<Game> {
        let current = self.find(selector).await?;
        let data = patch.apply(&current.data)?;

        let game = self
            .store
            .update(Game::new(current.id, data))
            .await?
            .ok_or_else(|| AppError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;
        tracing::info!(game_id = game.id, "Updated game");
        Ok(game)
    }

    /// Deletes the selected game and returns what was removed
    pub async fn delete(&self, selector: &GameSelector) -> AppResult<Game> {
        let game = self.find(selector).await?;
        if !self.store.delete(game.id).await? {
            return Err(AppError::NotFound(NOT_FOUND_MESSAGE.to_string()));
        }
        tracing::info!(game_id = game.id, "Deleted game");
        Ok(game)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{store::MockCatalogStore, MemoryStore};
    use crate::models::{attribute_set, GameData};
    use crate::services::{SortKey, SortOrder};
    use chrono::NaiveDate;
    use mockall::predicate::eq;

    fn data(name: &str, genres: &[&str]) -> GameData {
        let mut data = GameData::new(
            name,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            "29.99".parse().unwrap(),
        );
        data.genres = attribute_set(genres);
        data
    }

    #[tokio::test]
    async fn test_missing_selector_never_touches_store() {
        let service = CatalogService::new(Arc::new(MockCatalogStore::new()));

        let err = service.find(&GameSelector::default()).await.unwrap_err();
        assert!(matches!(err, AppError::MissingSelector));

        let blank = GameSelector {
            id: Some(String::new()),
            name: Some("   ".to_string()),
        };
        assert!(matches!(
            service.find(&blank).await.unwrap_err(),
            AppError::MissingSelector
        ));
    }

    #[tokio::test]
    async fn test_id_takes_precedence_over_name() {
        let mut store = MockCatalogStore::new();
        store
            .expect_get()
            .with(eq(7))
            .times(1)
            .returning(|id| Ok(Some(Game::new(id, data("Portal", &[])))));
        store.expect_find_by_name().never();

        let service = CatalogService::new(Arc::new(store));
        let selector = GameSelector {
            id: Some("7".to_string()),
            name: Some("Doom".to_string()),
        };

        assert_eq!(service.find(&selector).await.unwrap().id, 7);
    }

    #[tokio::test]
    async fn test_unknown_and_non_numeric_ids_are_not_found() {
        let mut store = MockCatalogStore::new();
        store.expect_get().with(eq(999)).returning(|_| Ok(None));

        let service = CatalogService::new(Arc::new(store));

        assert!(matches!(
            service.find(&GameSelector::by_id(999)).await.unwrap_err(),
            AppError::NotFound(_)
        ));
        let selector = GameSelector {
            id: Some("abc".to_string()),
            name: None,
        };
        assert!(matches!(
            service.find(&selector).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_store_errors_propagate() {
        let mut store = MockCatalogStore::new();
        store
            .expect_query()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));

        let service = CatalogService::new(Arc::new(store));
        let err = service.list(&ListQuery::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }

    #[tokio::test]
    async fn test_list_hands_parsed_query_to_store() {
        let mut store = MockCatalogStore::new();
        store
            .expect_query()
            .withf(|query| {
                query.filter.years == vec![2020]
                    && query.sort == Some((SortKey::Price, SortOrder::Asc))
                    && query.page.page == 3
            })
            .times(1)
            .returning(|query| Ok(query.page.page_of(0, Vec::new())));
        store.expect_list().never();

        let service = CatalogService::new(Arc::new(store));
        let params = ListQuery {
            filter_by: Some("year(2020)".to_string()),
            sort_by: Some("price".to_string()),
            sort_order: Some("asc".to_string()),
            page: Some("3".to_string()),
            ..Default::default()
        };

        let page = service.list(&params).await.unwrap();
        assert_eq!(page.previous, Some(2));
    }

    #[tokio::test]
    async fn test_name_is_matched_untrimmed() {
        let store = Arc::new(MemoryStore::new());
        store.insert(data("2064: Read Only Memories", &[])).await.unwrap();
        let portal = store.insert(data("Portal 2", &[])).await.unwrap();
        let service = CatalogService::new(store);

        let found = service.find(&GameSelector::by_name(" 2")).await.unwrap();
        assert_eq!(found.id, portal.id);
    }

    #[tokio::test]
    async fn test_update_of_vanished_record_is_not_found() {
        let mut store = MockCatalogStore::new();
        store
            .expect_get()
            .returning(|id| Ok(Some(Game::new(id, data("Portal", &[])))));
        store.expect_update().returning(|_| Ok(None));

        let service = CatalogService::new(Arc::new(store));
        let err = service
            .update(&GameSelector::by_id(1), GamePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_invalid_patch_leaves_record_unchanged() {
        let store = Arc::new(MemoryStore::new());
        let game = store.insert(data("Portal", &["Puzzle"])).await.unwrap();
        let service = CatalogService::new(store.clone());

        let patch = GamePatch {
            metacritic_score: Some(Some(150)),
            ..Default::default()
        };
        let err = service
            .update(&GameSelector::by_id(game.id), patch)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(store.get(game.id).await.unwrap(), Some(game));
    }

    #[tokio::test]
    async fn test_recommend_by_name() {
        let store = Arc::new(MemoryStore::new());
        store.insert(data("Dark Souls III", &["Action", "RPG"])).await.unwrap();
        store.insert(data("Stardew Valley", &["Simulation"])).await.unwrap();
        store.insert(data("Elden Ring", &["Action", "RPG"])).await.unwrap();
        store.insert(data("Dark Souls II", &["Action"])).await.unwrap();

        let service = CatalogService::new(store);
        let recommendation = service
            .recommend(&GameSelector::by_name("dark souls"))
            .await
            .unwrap();

        assert_eq!(recommendation.reference_game.data.name, "Dark Souls III");
        let names: Vec<&str> = recommendation
            .recommended_games
            .iter()
            .map(|s| s.game.data.name.as_str())
            .collect();
        assert_eq!(names, vec!["Elden Ring", "Dark Souls II"]);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let store = Arc::new(MemoryStore::new());
        let game = store.insert(data("Portal", &[])).await.unwrap();
        let service = CatalogService::new(store.clone());

        let deleted = service.delete(&GameSelector::by_name("portal")).await.unwrap();
        assert_eq!(deleted.id, game.id);
        assert!(store.list().await.unwrap().is_empty());
        assert!(matches!(
            service.delete(&GameSelector::by_id(game.id)).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }
}
