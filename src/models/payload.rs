use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{de::Error as _, Deserialize, Deserializer};

use crate::error::ValidationErrors;

use super::game::{attribute_set, Association, GameData};

/// Wire format accepted for release dates
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Payload for creating a game
///
/// Every field is optional on the wire so that missing required fields are
/// reported together with the other validation failures.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewGame {
    pub name: Option<String>,
    pub release_date: Option<String>,
    pub estimated_owners: Option<i64>,
    pub peak_concurrent_users: Option<i64>,
    pub required_age: Option<i32>,
    #[serde(default, deserialize_with = "decimal")]
    pub price: Option<BigDecimal>,
    pub dlc_count: Option<i64>,
    pub about_the_game: Option<String>,
    #[serde(default)]
    pub supported_languages: Vec<String>,
    #[serde(default)]
    pub full_audio_languages: Vec<String>,
    pub header_image: Option<String>,
    pub website: Option<String>,
    pub support_url: Option<String>,
    pub support_email: Option<String>,
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub mac: bool,
    #[serde(default)]
    pub linux: bool,
    pub metacritic_score: Option<i32>,
    pub metacritic_url: Option<String>,
    pub positive_ratings: Option<i64>,
    pub negative_ratings: Option<i64>,
    pub achievements: Option<i64>,
    pub average_playtime: Option<i64>,
    pub median_playtime: Option<i64>,
    #[serde(default)]
    pub developers: Vec<String>,
    #[serde(default)]
    pub publishers: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Payload for a partial update
///
/// Every field is doubly optional so that an absent field (`None`) is never
/// confused with an explicit `null` (`Some(None)`). `null` clears a nullable
/// field and is a validation error for any other. Association lists replace
/// the whole set when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GamePatch {
    #[serde(default, deserialize_with = "nullable")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub release_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub estimated_owners: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub peak_concurrent_users: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub required_age: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable_decimal")]
    pub price: Option<Option<BigDecimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub dlc_count: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub about_the_game: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub supported_languages: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub full_audio_languages: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub header_image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub support_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub support_email: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub windows: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub mac: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub linux: Option<Option<bool>>,
    #[serde(default, deserialize_with = "nullable")]
    pub metacritic_score: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub metacritic_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub positive_ratings: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub negative_ratings: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub achievements: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub average_playtime: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub median_playtime: Option<Option<i64>>,
    #[serde(default, deserialize_with = "nullable")]
    pub developers: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub publishers: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub categories: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub genres: Option<Option<Vec<String>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tags: Option<Option<Vec<String>>>,
}

/// Distinguishes an explicit `null` from a missing field
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// A price sent either as a string or as a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum DecimalInput {
    Text(String),
    Number(f64),
}

/// Reads a decimal from a string as-is, or from a number via its shortest
/// round-tripping form so that `29.99` stays `29.99`
fn decimal<'de, D>(deserializer: D) -> Result<Option<BigDecimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<DecimalInput>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(DecimalInput::Text(text)) => text,
        Some(DecimalInput::Number(number)) if number.is_finite() => number.to_string(),
        Some(DecimalInput::Number(number)) => {
            return Err(D::Error::custom(format!("{} is not a valid price", number)))
        }
    };
    BigDecimal::from_str(raw.trim())
        .map(Some)
        .map_err(|_| D::Error::custom(format!("'{}' is not a valid price", raw)))
}

fn nullable_decimal<'de, D>(deserializer: D) -> Result<Option<Option<BigDecimal>>, D::Error>
where
    D: Deserializer<'de>,
{
    decimal(deserializer).map(Some)
}

/// Unwraps a patch slot for a field that cannot be cleared
fn required<T>(
    slot: Option<Option<T>>,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<T> {
    match slot {
        Some(Some(value)) => Some(value),
        Some(None) => {
            errors.add(field, "may not be null");
            None
        }
        None => None,
    }
}

fn parse_date(raw: &str, errors: &mut ValidationErrors) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("release_date", "must be a date in YYYY-MM-DD format");
            None
        }
    }
}

impl NewGame {
    /// Validates the payload into a storable record, collecting every violation
    pub fn into_data(self) -> Result<GameData, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = self.name.unwrap_or_default();
        if name.is_empty() {
            errors.add("name", "is required");
        }

        let release_date = match self.release_date.as_deref() {
            Some(raw) => parse_date(raw, &mut errors),
            None => {
                errors.add("release_date", "is required");
                None
            }
        };

        let price = match self.price {
            Some(price) => price,
            None => {
                errors.add("price", "is required");
                BigDecimal::from(0)
            }
        };

        let mut data = GameData::new(name, release_date.unwrap_or_default(), price);
        data.estimated_owners = self.estimated_owners;
        data.peak_concurrent_users = self.peak_concurrent_users;
        data.required_age = self.required_age.unwrap_or(0);
        data.dlc_count = self.dlc_count.unwrap_or(0);
        data.about_the_game = self.about_the_game;
        data.supported_languages = attribute_set(self.supported_languages);
        data.full_audio_languages = attribute_set(self.full_audio_languages);
        data.header_image = self.header_image;
        data.website = self.website;
        data.support_url = self.support_url;
        data.support_email = self.support_email;
        data.windows = self.windows;
        data.mac = self.mac;
        data.linux = self.linux;
        data.metacritic_score = self.metacritic_score;
        data.metacritic_url = self.metacritic_url;
        data.positive_ratings = self.positive_ratings;
        data.negative_ratings = self.negative_ratings;
        data.achievements = self.achievements;
        data.average_playtime = self.average_playtime.unwrap_or(0);
        data.median_playtime = self.median_playtime.unwrap_or(0);
        data.developers = attribute_set(self.developers);
        data.publishers = attribute_set(self.publishers);
        data.categories = attribute_set(self.categories);
        data.genres = attribute_set(self.genres);
        data.tags = attribute_set(self.tags);

        // Skip the blank-name check when the name is simply missing
        let mut invariants = ValidationErrors::new();
        data.check(&mut invariants);
        for (field, messages) in invariants {
            if field == "name" && errors.contains("name") {
                continue;
            }
            for message in messages {
                errors.add(field, message);
            }
        }

        errors.into_result(data)
    }
}

impl GamePatch {
    /// Merges the supplied fields over `current` and validates the result
    pub fn apply(self, current: &GameData) -> Result<GameData, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut data = current.clone();

        if let Some(name) = required(self.name, "name", &mut errors) {
            data.name = name;
        }
        if let Some(raw) = required(self.release_date, "release_date", &mut errors) {
            if let Some(date) = parse_date(&raw, &mut errors) {
                data.release_date = date;
            }
        }
        if let Some(v) = self.estimated_owners {
            data.estimated_owners = v;
        }
        if let Some(v) = self.peak_concurrent_users {
            data.peak_concurrent_users = v;
        }
        if let Some(v) = required(self.required_age, "required_age", &mut errors) {
            data.required_age = v;
        }
        if let Some(v) = required(self.price, "price", &mut errors) {
            data.price = v;
        }
        if let Some(v) = required(self.dlc_count, "dlc_count", &mut errors) {
            data.dlc_count = v;
        }
        if let Some(v) = self.about_the_game {
            data.about_the_game = v;
        }
        if let Some(v) = self.header_image {
            data.header_image = v;
        }
        if let Some(v) = self.website {
            data.website = v;
        }
        if let Some(v) = self.support_url {
            data.support_url = v;
        }
        if let Some(v) = self.support_email {
            data.support_email = v;
        }
        if let Some(v) = required(self.windows, "windows", &mut errors) {
            data.windows = v;
        }
        if let Some(v) = required(self.mac, "mac", &mut errors) {
            data.mac = v;
        }
        if let Some(v) = required(self.linux, "linux", &mut errors) {
            data.linux = v;
        }
        if let Some(v) = self.metacritic_score {
            data.metacritic_score = v;
        }
        if let Some(v) = self.metacritic_url {
            data.metacritic_url = v;
        }
        if let Some(v) = self.positive_ratings {
            data.positive_ratings = v;
        }
        if let Some(v) = self.negative_ratings {
            data.negative_ratings = v;
        }
        if let Some(v) = self.achievements {
            data.achievements = v;
        }
        if let Some(v) = required(self.average_playtime, "average_playtime", &mut errors) {
            data.average_playtime = v;
        }
        if let Some(v) = required(self.median_playtime, "median_playtime", &mut errors) {
            data.median_playtime = v;
        }

        let associations = [
            (Association::SupportedLanguage, self.supported_languages),
            (Association::FullAudioLanguage, self.full_audio_languages),
            (Association::Developer, self.developers),
            (Association::Publisher, self.publishers),
            (Association::Category, self.categories),
            (Association::Genre, self.genres),
            (Association::Tag, self.tags),
        ];
        for (kind, slot) in associations {
            if let Some(names) = required(slot, kind.field(), &mut errors) {
                *data.association_mut(kind) = attribute_set(names);
            }
        }

        data.check(&mut errors);
        errors.into_result(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> GameData {
        let mut data = GameData::new(
            "Hollow Knight",
            NaiveDate::from_ymd_opt(2017, 2, 24).unwrap(),
            "14.99".parse().unwrap(),
        );
        data.metacritic_score = Some(87);
        data.website = Some("https://hollowknight.com".to_string());
        data.genres = attribute_set(["Action", "Adventure"]);
        data.tags = attribute_set(["Metroidvania"]);
        data
    }

    #[test]
    fn test_create_collects_missing_required_fields() {
        let payload: NewGame = serde_json::from_value(json!({
            "metacritic_score": 120,
        }))
        .unwrap();

        let errors = payload.into_data().unwrap_err();
        assert_eq!(errors.messages("name"), ["is required".to_string()]);
        assert!(errors.contains("release_date"));
        assert!(errors.contains("price"));
        assert!(errors.contains("metacritic_score"));
    }

    #[test]
    fn test_create_rejects_malformed_date() {
        let payload: NewGame = serde_json::from_value(json!({
            "name": "Celeste",
            "release_date": "25/01/2018",
            "price": "19.99",
        }))
        .unwrap();

        let errors = payload.into_data().unwrap_err();
        assert_eq!(errors.messages("release_date").len(), 1);
        assert!(!errors.contains("name"));
    }

    #[test]
    fn test_create_builds_record() {
        let payload: NewGame = serde_json::from_value(json!({
            "name": "Celeste",
            "release_date": "2018-01-25",
            "price": "19.99",
            "windows": true,
            "genres": ["Platformer", " Indie ", "Indie"],
        }))
        .unwrap();

        let data = payload.into_data().unwrap();
        assert_eq!(data.name, "Celeste");
        assert_eq!(data.release_date, NaiveDate::from_ymd_opt(2018, 1, 25).unwrap());
        assert!(data.windows);
        assert_eq!(data.genres, attribute_set(["Indie", "Platformer"]));
        assert_eq!(data.required_age, 0);
    }

    #[test]
    fn test_patch_absent_fields_are_untouched() {
        let patch: GamePatch = serde_json::from_value(json!({ "name": "Hollow Knight: Voidheart" })).unwrap();

        let merged = patch.apply(&base()).unwrap();
        assert_eq!(merged.name, "Hollow Knight: Voidheart");
        assert_eq!(merged.metacritic_score, Some(87));
        assert_eq!(merged.website.as_deref(), Some("https://hollowknight.com"));
        assert_eq!(merged.genres, base().genres);
    }

    #[test]
    fn test_patch_null_clears_nullable_fields() {
        let patch: GamePatch = serde_json::from_value(json!({
            "metacritic_score": null,
            "website": null,
        }))
        .unwrap();
        assert_eq!(patch.metacritic_score, Some(None));

        let merged = patch.apply(&base()).unwrap();
        assert_eq!(merged.metacritic_score, None);
        assert_eq!(merged.website, None);
    }

    #[test]
    fn test_patch_null_on_required_fields_is_rejected() {
        let patch: GamePatch = serde_json::from_value(json!({
            "name": null,
            "price": null,
            "windows": null,
            "genres": null,
        }))
        .unwrap();
        assert_eq!(patch.name, Some(None));

        let errors = patch.apply(&base()).unwrap_err();
        for field in ["name", "price", "windows", "genres"] {
            assert_eq!(
                errors.messages(field),
                ["may not be null".to_string()],
                "wrong errors for {}",
                field
            );
        }
    }

    #[test]
    fn test_price_accepts_numbers_and_strings() {
        let payload: NewGame = serde_json::from_value(json!({
            "name": "Elden Ring",
            "release_date": "2022-02-24",
            "price": 29.99,
        }))
        .unwrap();
        assert_eq!(payload.into_data().unwrap().price, "29.99".parse::<BigDecimal>().unwrap());

        let patch: GamePatch = serde_json::from_value(json!({ "price": 60 })).unwrap();
        assert_eq!(patch.apply(&base()).unwrap().price, BigDecimal::from(60));

        let patch: GamePatch = serde_json::from_value(json!({ "price": "19.99" })).unwrap();
        assert_eq!(patch.apply(&base()).unwrap().price, "19.99".parse::<BigDecimal>().unwrap());

        assert!(serde_json::from_value::<NewGame>(json!({ "price": "cheap" })).is_err());
        assert!(serde_json::from_value::<NewGame>(json!({ "price": true })).is_err());
    }

    #[test]
    fn test_patch_replaces_only_supplied_association() {
        let patch: GamePatch = serde_json::from_value(json!({ "tags": ["Souls-like", "Difficult"] })).unwrap();

        let merged = patch.apply(&base()).unwrap();
        assert_eq!(merged.tags, attribute_set(["Difficult", "Souls-like"]));
        assert_eq!(merged.genres, attribute_set(["Action", "Adventure"]));
    }

    #[test]
    fn test_patch_validates_merged_record() {
        let patch: GamePatch = serde_json::from_value(json!({
            "required_age": 40,
            "dlc_count": -1,
            "release_date": "soon",
        }))
        .unwrap();

        let errors = patch.apply(&base()).unwrap_err();
        assert!(errors.contains("required_age"));
        assert!(errors.contains("dlc_count"));
        assert!(errors.contains("release_date"));
    }
}
