use std::sync::OnceLock;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::AppResult,
    models::{attribute_set, Association, AttributeSet, Game, GameData},
    services::{GameFilter, GameQuery, Page, SortKey, SortOrder},
};

use super::CatalogStore;

/// Creates a PostgreSQL connection pool
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the catalog schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("Database migrations applied");
    Ok(())
}

/// Catalog backed by PostgreSQL
///
/// Each association kind lives in a lookup table named after the game field
/// (`genres`, `tags`, ...) with a unique `name`, joined through
/// `game_<field>(game_id, lookup_id)`. Deleting a game cascades to the join
/// rows only; lookup rows are shared between games and stay.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct GameRow {
    id: i64,
    name: String,
    release_date: NaiveDate,
    estimated_owners: Option<i64>,
    peak_concurrent_users: Option<i64>,
    required_age: i32,
    price: BigDecimal,
    dlc_count: i64,
    about_the_game: Option<String>,
    header_image: Option<String>,
    website: Option<String>,
    support_url: Option<String>,
    support_email: Option<String>,
    windows: bool,
    mac: bool,
    linux: bool,
    metacritic_score: Option<i32>,
    metacritic_url: Option<String>,
    positive_ratings: Option<i64>,
    negative_ratings: Option<i64>,
    achievements: Option<i64>,
    average_playtime: i64,
    median_playtime: i64,
    supported_languages: Vec<String>,
    full_audio_languages: Vec<String>,
    developers: Vec<String>,
    publishers: Vec<String>,
    categories: Vec<String>,
    genres: Vec<String>,
    tags: Vec<String>,
}

impl From<GameRow> for Game {
    fn from(row: GameRow) -> Self {
        let mut data = GameData::new(row.name, row.release_date, row.price);
        data.estimated_owners = row.estimated_owners;
        data.peak_concurrent_users = row.peak_concurrent_users;
        data.required_age = row.required_age;
        data.dlc_count = row.dlc_count;
        data.about_the_game = row.about_the_game;
        data.header_image = row.header_image;
        data.website = row.website;
        data.support_url = row.support_url;
        data.support_email = row.support_email;
        data.windows = row.windows;
        data.mac = row.mac;
        data.linux = row.linux;
        data.metacritic_score = row.metacritic_score;
        data.metacritic_url = row.metacritic_url;
        data.positive_ratings = row.positive_ratings;
        data.negative_ratings = row.negative_ratings;
        data.achievements = row.achievements;
        data.average_playtime = row.average_playtime;
        data.median_playtime = row.median_playtime;
        data.supported_languages = attribute_set(row.supported_languages);
        data.full_audio_languages = attribute_set(row.full_audio_languages);
        data.developers = attribute_set(row.developers);
        data.publishers = attribute_set(row.publishers);
        data.categories = attribute_set(row.categories);
        data.genres = attribute_set(row.genres);
        data.tags = attribute_set(row.tags);
        Game::new(row.id, data)
    }
}

const GAME_COLUMNS: &str = "g.id, g.name, g.release_date, g.estimated_owners, \
    g.peak_concurrent_users, g.required_age, g.price, g.dlc_count, g.about_the_game, \
    g.header_image, g.website, g.support_url, g.support_email, g.windows, g.mac, g.linux, \
    g.metacritic_score, g.metacritic_url, g.positive_ratings, g.negative_ratings, \
    g.achievements, g.average_playtime, g.median_playtime";

/// SELECT over `games g` with every association folded into a text array
fn select_games() -> &'static str {
    static SQL: OnceLock<String> = OnceLock::new();
    SQL.get_or_init(|| {
        let associations: Vec<String> = Association::ALL
            .iter()
            .map(|kind| {
                let table = kind.field();
                format!(
                    "ARRAY(SELECT l.name::TEXT FROM game_{table} j \
                     JOIN {table} l ON l.id = j.lookup_id \
                     WHERE j.game_id = g.id ORDER BY l.name) AS {table}"
                )
            })
            .collect();
        format!(
            "SELECT {}, {} FROM games g",
            GAME_COLUMNS,
            associations.join(", ")
        )
    })
}

/// Escapes LIKE wildcards so a name fragment matches literally
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Appends the WHERE clause for `filter`, if it constrains anything.
///
/// Mirrors `GameFilter::matches`: genre fragments are case-insensitive
/// substrings of any genre name, platforms are OR-ed, years are exact.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &GameFilter) {
    let mut separator = " WHERE ";

    if !filter.genres.is_empty() {
        builder.push(separator);
        separator = " AND ";
        let patterns: Vec<String> = filter.genres.iter().map(|g| like_pattern(g)).collect();
        builder
            .push(
                "EXISTS (SELECT 1 FROM game_genres j JOIN genres l ON l.id = j.lookup_id \
                 WHERE j.game_id = g.id AND l.name ILIKE ANY(",
            )
            .push_bind(patterns)
            .push("))");
    }

    if !filter.platforms.is_empty() {
        builder.push(separator);
        separator = " AND ";
        let columns: Vec<String> = filter
            .platforms
            .iter()
            .map(|platform| format!("g.{}", platform))
            .collect();
        builder.push(format!("({})", columns.join(" OR ")));
    }

    if !filter.years.is_empty() {
        builder.push(separator);
        builder
            .push("EXTRACT(YEAR FROM g.release_date)::INT = ANY(")
            .push_bind(filter.years.clone())
            .push(")");
    }
}

/// ORDER BY matching `sort_games`: missing scores last, ties by id
fn order_by(sort: Option<(SortKey, SortOrder)>) -> String {
    let Some((key, order)) = sort else {
        return " ORDER BY g.id".to_string();
    };
    let column = match key {
        SortKey::MetacriticScore => "g.metacritic_score",
        SortKey::Price => "g.price",
        SortKey::ReleaseDate => "g.release_date",
    };
    let direction = match order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    format!(" ORDER BY {column} {direction} NULLS LAST, g.id")
}

fn count_sql(filter: &GameFilter) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM games g");
    push_filter(&mut builder, filter);
    builder
}

fn page_sql(query: &GameQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(select_games());
    push_filter(&mut builder, &query.filter);
    builder.push(order_by(query.sort));
    builder
        .push(" LIMIT ")
        .push_bind(i64::try_from(query.page.page_size).unwrap_or(i64::MAX))
        .push(" OFFSET ")
        .push_bind(i64::try_from(query.page.offset()).unwrap_or(i64::MAX));
    builder
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replaces the association rows of one kind for a game
    async fn link(
        tx: &mut Transaction<'_, Postgres>,
        game_id: i64,
        kind: Association,
        names: &AttributeSet,
    ) -> Result<(), sqlx::Error> {
        let table = kind.field();

        let sql = format!("DELETE FROM game_{table} WHERE game_id = $1");
        sqlx::query(&sql).bind(game_id).execute(&mut **tx).await?;

        if names.is_empty() {
            return Ok(());
        }
        let names: Vec<String> = names.iter().cloned().collect();

        let sql = format!(
            "INSERT INTO {table} (name) SELECT UNNEST($1::TEXT[]) ON CONFLICT (name) DO NOTHING"
        );
        sqlx::query(&sql).bind(&names[..]).execute(&mut **tx).await?;

        let sql = format!(
            "INSERT INTO game_{table} (game_id, lookup_id) \
             SELECT $1, id FROM {table} WHERE name = ANY($2)"
        );
        sqlx::query(&sql)
            .bind(game_id)
            .bind(&names[..])
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    async fn link_all(
        tx: &mut Transaction<'_, Postgres>,
        game_id: i64,
        data: &GameData,
    ) -> Result<(), sqlx::Error> {
        for kind in Association::ALL {
            Self::link(tx, game_id, kind, data.association(kind)).await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn list(&self) -> AppResult<Vec<Game>> {
        let sql = format!("{} ORDER BY g.id", select_games());
        let rows: Vec<GameRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Game::from).collect())
    }

    async fn query(&self, query: &GameQuery) -> AppResult<Page<Game>> {
        let count: i64 = count_sql(&query.filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        let rows: Vec<GameRow> = page_sql(query)
            .build_query_as()
            .fetch_all(&self.pool)
            .await?;

        let results = rows.into_iter().map(Game::from).collect();
        Ok(query
            .page
            .page_of(usize::try_from(count).unwrap_or_default(), results))
    }

    async fn get(&self, id: i64) -> AppResult<Option<Game>> {
        let sql = format!("{} WHERE g.id = $1", select_games());
        let row: Option<GameRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Game::from))
    }

    async fn find_by_name(&self, fragment: &str) -> AppResult<Option<Game>> {
        let sql = format!(
            "{} WHERE g.name ILIKE $1 ORDER BY g.id LIMIT 1",
            select_games()
        );
        let row: Option<GameRow> = sqlx::query_as(&sql)
            .bind(like_pattern(fragment))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Game::from))
    }

    async fn insert(&self, data: GameData) -> AppResult<Game> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO games (name, release_date, estimated_owners, peak_concurrent_users, \
             required_age, price, dlc_count, about_the_game, header_image, website, support_url, \
             support_email, windows, mac, linux, metacritic_score, metacritic_url, \
             positive_ratings, negative_ratings, achievements, average_playtime, median_playtime) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
             $17, $18, $19, $20, $21, $22) RETURNING id",
        )
        .bind(&data.name)
        .bind(data.release_date)
        .bind(data.estimated_owners)
        .bind(data.peak_concurrent_users)
        .bind(data.required_age)
        .bind(&data.price)
        .bind(data.dlc_count)
        .bind(&data.about_the_game)
        .bind(&data.header_image)
        .bind(&data.website)
        .bind(&data.support_url)
        .bind(&data.support_email)
        .bind(data.windows)
        .bind(data.mac)
        .bind(data.linux)
        .bind(data.metacritic_score)
        .bind(&data.metacritic_url)
        .bind(data.positive_ratings)
        .bind(data.negative_ratings)
        .bind(data.achievements)
        .bind(data.average_playtime)
        .bind(data.median_playtime)
        .fetch_one(&mut *tx)
        .await?;

        Self::link_all(&mut tx, id, &data).await?;
        tx.commit().await?;

        tracing::debug!(game_id = id, "Inserted game");
        Ok(Game::new(id, data))
    }

    async fn update(&self, game: Game) -> AppResult<Option<Game>> {
        let mut tx = self.pool.begin().await?;
        let data = &game.data;

        let result = sqlx::query(
            "UPDATE games SET name = $2, release_date = $3, estimated_owners = $4, \
             peak_concurrent_users = $5, required_age = $6, price = $7, dlc_count = $8, \
             about_the_game = $9, header_image = $10, website = $11, support_url = $12, \
             support_email = $13, windows = $14, mac = $15, linux = $16, \
             metacritic_score = $17, metacritic_url = $18, positive_ratings = $19, \
             negative_ratings = $20, achievements = $21, average_playtime = $22, \
             median_playtime = $23 WHERE id = $1",
        )
        .bind(game.id)
        .bind(&data.name)
        .bind(data.release_date)
        .bind(data.estimated_owners)
        .bind(data.peak_concurrent_users)
        .bind(data.required_age)
        .bind(&data.price)
        .bind(data.dlc_count)
        .bind(&data.about_the_game)
        .bind(&data.header_image)
        .bind(&data.website)
        .bind(&data.support_url)
        .bind(&data.support_email)
        .bind(data.windows)
        .bind(data.mac)
        .bind(data.linux)
        .bind(data.metacritic_score)
        .bind(&data.metacritic_url)
        .bind(data.positive_ratings)
        .bind(data.negative_ratings)
        .bind(data.achievements)
        .bind(data.average_playtime)
        .bind(data.median_playtime)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::link_all(&mut tx, game.id, data).await?;
        tx.commit().await?;

        Ok(Some(game))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM games WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
