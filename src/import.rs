//! Bulk import of the Steam games CSV dump.
//!
//! Rows are converted into [`GameData`] with the same invariants the API
//! enforces. A row that cannot be converted is logged and skipped so one bad
//! line does not abort a large import.

use std::io::Read;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::{
    db::CatalogStore,
    error::ValidationErrors,
    models::{attribute_set, AttributeSet, GameData},
};

/// Columns of the CSV dump that map onto catalog fields
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CsvRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Release date")]
    pub release_date: String,
    #[serde(rename = "Estimated owners")]
    pub estimated_owners: String,
    #[serde(rename = "Peak CCU")]
    pub peak_ccu: String,
    #[serde(rename = "Required age")]
    pub required_age: String,
    #[serde(rename = "Price")]
    pub price: String,
    #[serde(rename = "DLC count")]
    pub dlc_count: String,
    #[serde(rename = "About the game")]
    pub about_the_game: String,
    #[serde(rename = "Supported languages")]
    pub supported_languages: String,
    #[serde(rename = "Full audio languages")]
    pub full_audio_languages: String,
    #[serde(rename = "Header image")]
    pub header_image: String,
    #[serde(rename = "Website")]
    pub website: String,
    #[serde(rename = "Support url")]
    pub support_url: String,
    #[serde(rename = "Support email")]
    pub support_email: String,
    #[serde(rename = "Windows")]
    pub windows: String,
    #[serde(rename = "Mac")]
    pub mac: String,
    #[serde(rename = "Linux")]
    pub linux: String,
    #[serde(rename = "Metacritic score")]
    pub metacritic_score: String,
    #[serde(rename = "Metacritic url")]
    pub metacritic_url: String,
    #[serde(rename = "Positive")]
    pub positive: String,
    #[serde(rename = "Negative")]
    pub negative: String,
    #[serde(rename = "Achievements")]
    pub achievements: String,
    #[serde(rename = "Average playtime forever")]
    pub average_playtime: String,
    #[serde(rename = "Median playtime forever")]
    pub median_playtime: String,
    #[serde(rename = "Developers")]
    pub developers: String,
    #[serde(rename = "Publishers")]
    pub publishers: String,
    #[serde(rename = "Categories")]
    pub categories: String,
    #[serde(rename = "Genres")]
    pub genres: String,
    #[serde(rename = "Tags")]
    pub tags: String,
}

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

fn text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn number<T: FromStr>(raw: &str, field: &'static str, errors: &mut ValidationErrors) -> Option<T> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            errors.add(field, format!("'{}' is not a number", trimmed));
            None
        }
    }
}

fn flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// `Feb 24, 2022`, or `Feb 2022` for month-only dates (day 1)
fn release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%b %d, %Y")
        .or_else(|_| NaiveDate::parse_from_str(&format!("1 {}", raw), "%d %b %Y"))
        .ok()
}

/// `20000000 - 50000000` keeps the lower bound
fn owners(raw: &str, errors: &mut ValidationErrors) -> Option<i64> {
    let lower = raw.split('-').next().unwrap_or_default();
    number(lower, "estimated_owners", errors)
}

/// `['English', 'French']`
fn language_list(raw: &str) -> AttributeSet {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    attribute_set(
        inner
            .split(',')
            .map(|item| item.trim().trim_matches(|c| c == '\'' || c == '"'))
            .filter(|item| !item.is_empty()),
    )
}

fn comma_list(raw: &str) -> AttributeSet {
    attribute_set(raw.split(',').filter(|item| !item.trim().is_empty()))
}

impl CsvRow {
    /// Converts the row, collecting every conversion and invariant failure
    pub fn into_data(self) -> Result<GameData, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let date = release_date(&self.release_date);
        if date.is_none() {
            errors.add(
                "release_date",
                format!("'{}' is not a recognised date", self.release_date.trim()),
            );
        }
        let price = if self.price.trim().is_empty() {
            BigDecimal::from(0)
        } else {
            number::<BigDecimal>(&self.price, "price", &mut errors).unwrap_or_default()
        };

        let mut data = GameData::new(self.name.trim(), date.unwrap_or_default(), price);
        data.estimated_owners = owners(&self.estimated_owners, &mut errors);
        data.peak_concurrent_users = number(&self.peak_ccu, "peak_concurrent_users", &mut errors);
        data.required_age = number(&self.required_age, "required_age", &mut errors).unwrap_or(0);
        data.dlc_count = number(&self.dlc_count, "dlc_count", &mut errors).unwrap_or(0);
        data.about_the_game = text(&self.about_the_game);
        data.supported_languages = language_list(&self.supported_languages);
        data.full_audio_languages = language_list(&self.full_audio_languages);
        data.header_image = text(&self.header_image);
        data.website = text(&self.website);
        data.support_url = text(&self.support_url);
        data.support_email = text(&self.support_email);
        data.windows = flag(&self.windows);
        data.mac = flag(&self.mac);
        data.linux = flag(&self.linux);
        // The dump uses 0 for "no score"
        data.metacritic_score = number(&self.metacritic_score, "metacritic_score", &mut errors)
            .filter(|score| *score > 0);
        data.metacritic_url = text(&self.metacritic_url);
        data.positive_ratings = number(&self.positive, "positive_ratings", &mut errors);
        data.negative_ratings = number(&self.negative, "negative_ratings", &mut errors);
        data.achievements = number(&self.achievements, "achievements", &mut errors);
        data.average_playtime =
            number(&self.average_playtime, "average_playtime", &mut errors).unwrap_or(0);
        data.median_playtime =
            number(&self.median_playtime, "median_playtime", &mut errors).unwrap_or(0);
        data.developers = comma_list(&self.developers);
        data.publishers = comma_list(&self.publishers);
        data.categories = comma_list(&self.categories);
        data.genres = comma_list(&self.genres);
        data.tags = comma_list(&self.tags);

        data.check(&mut errors);
        errors.into_result(data)
    }
}

/// Reads CSV records from `reader` and inserts every valid row into `store`
pub async fn import_games<R: Read>(
    reader: R,
    store: &dyn CatalogStore,
) -> anyhow::Result<ImportSummary> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut summary = ImportSummary::default();

    for (index, record) in csv_reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1
        let line = index + 2;

        let row = match record {
            Ok(row) => row,
            Err(e) => {
                tracing::error!(line, error = %e, "Unreadable CSV record");
                summary.skipped += 1;
                continue;
            }
        };

        let name = row.name.clone();
        match row.into_data() {
            Ok(data) => {
                store.insert(data).await?;
                summary.imported += 1;
            }
            Err(errors) => {
                tracing::error!(line, name = %name, errors = %errors, "Skipping invalid game");
                summary.skipped += 1;
            }
        }
    }

    tracing::info!(
        imported = summary.imported,
        skipped = summary.skipped,
        "Import finished"
    );

    Ok(summary)
}
