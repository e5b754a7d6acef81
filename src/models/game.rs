use std::collections::BTreeSet;
use std::fmt::Display;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;

/// Names of the lookup entities a game is associated with
pub type AttributeSet = BTreeSet<String>;

/// Largest price the catalog stores (ten digits, two of them decimal)
const PRICE_LIMIT: i64 = 100_000_000;
const MAX_REQUIRED_AGE: i32 = 21;
const MAX_METACRITIC_SCORE: i32 = 100;

/// A catalog entry with its store-assigned identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    #[serde(flatten)]
    pub data: GameData,
}

/// Everything about a game except its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    pub name: String,
    pub release_date: NaiveDate,
    pub estimated_owners: Option<i64>,
    pub peak_concurrent_users: Option<i64>,
    pub required_age: i32,
    pub price: BigDecimal,
    pub dlc_count: i64,
    pub about_the_game: Option<String>,
    pub supported_languages: AttributeSet,
    pub full_audio_languages: AttributeSet,
    pub header_image: Option<String>,
    pub website: Option<String>,
    pub support_url: Option<String>,
    pub support_email: Option<String>,
    pub windows: bool,
    pub mac: bool,
    pub linux: bool,
    pub metacritic_score: Option<i32>,
    pub metacritic_url: Option<String>,
    pub positive_ratings: Option<i64>,
    pub negative_ratings: Option<i64>,
    pub achievements: Option<i64>,
    pub average_playtime: i64,
    pub median_playtime: i64,
    pub developers: AttributeSet,
    pub publishers: AttributeSet,
    pub categories: AttributeSet,
    pub genres: AttributeSet,
    pub tags: AttributeSet,
}

/// Operating systems a game can ship for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Mac,
    Linux,
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "windows" => Ok(Platform::Windows),
            "mac" => Ok(Platform::Mac),
            "linux" => Ok(Platform::Linux),
            other => Err(format!("unknown platform '{}'", other)),
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Windows => write!(f, "windows"),
            Platform::Mac => write!(f, "mac"),
            Platform::Linux => write!(f, "linux"),
        }
    }
}

/// The categorical associations a game carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Association {
    SupportedLanguage,
    FullAudioLanguage,
    Developer,
    Publisher,
    Category,
    Genre,
    Tag,
}

impl Association {
    pub const ALL: [Association; 7] = [
        Association::SupportedLanguage,
        Association::FullAudioLanguage,
        Association::Developer,
        Association::Publisher,
        Association::Category,
        Association::Genre,
        Association::Tag,
    ];

    /// Field name of the association on a game
    pub fn field(self) -> &'static str {
        match self {
            Association::SupportedLanguage => "supported_languages",
            Association::FullAudioLanguage => "full_audio_languages",
            Association::Developer => "developers",
            Association::Publisher => "publishers",
            Association::Category => "categories",
            Association::Genre => "genres",
            Association::Tag => "tags",
        }
    }

    /// Longest name a lookup entity of this kind may have
    pub fn max_name_len(self) -> usize {
        match self {
            Association::Developer | Association::Publisher => 255,
            _ => 50,
        }
    }
}

impl Game {
    pub fn new(id: i64, data: GameData) -> Self {
        Self { id, data }
    }

    pub fn supports(&self, platform: Platform) -> bool {
        match platform {
            Platform::Windows => self.data.windows,
            Platform::Mac => self.data.mac,
            Platform::Linux => self.data.linux,
        }
    }

    pub fn release_year(&self) -> i32 {
        self.data.release_date.year()
    }

    /// Case-insensitive substring match against the full name
    pub fn name_contains(&self, needle: &str) -> bool {
        self.data
            .name
            .to_lowercase()
            .contains(&needle.to_lowercase())
    }
}

impl GameData {
    /// Creates a record with the required fields set and everything else empty
    pub fn new(name: impl Into<String>, release_date: NaiveDate, price: BigDecimal) -> Self {
        Self {
            name: name.into(),
            release_date,
            estimated_owners: None,
            peak_concurrent_users: None,
            required_age: 0,
            price,
            dlc_count: 0,
            about_the_game: None,
            supported_languages: AttributeSet::new(),
            full_audio_languages: AttributeSet::new(),
            header_image: None,
            website: None,
            support_url: None,
            support_email: None,
            windows: false,
            mac: false,
            linux: false,
            metacritic_score: None,
            metacritic_url: None,
            positive_ratings: None,
            negative_ratings: None,
            achievements: None,
            average_playtime: 0,
            median_playtime: 0,
            developers: AttributeSet::new(),
            publishers: AttributeSet::new(),
            categories: AttributeSet::new(),
            genres: AttributeSet::new(),
            tags: AttributeSet::new(),
        }
    }

    pub fn association(&self, kind: Association) -> &AttributeSet {
        match kind {
            Association::SupportedLanguage => &self.supported_languages,
            Association::FullAudioLanguage => &self.full_audio_languages,
            Association::Developer => &self.developers,
            Association::Publisher => &self.publishers,
            Association::Category => &self.categories,
            Association::Genre => &self.genres,
            Association::Tag => &self.tags,
        }
    }

    pub fn association_mut(&mut self, kind: Association) -> &mut AttributeSet {
        match kind {
            Association::SupportedLanguage => &mut self.supported_languages,
            Association::FullAudioLanguage => &mut self.full_audio_languages,
            Association::Developer => &mut self.developers,
            Association::Publisher => &mut self.publishers,
            Association::Category => &mut self.categories,
            Association::Genre => &mut self.genres,
            Association::Tag => &mut self.tags,
        }
    }

    /// Checks every field invariant, recording each violation
    pub fn check(&self, errors: &mut ValidationErrors) {
        if self.name.trim().is_empty() {
            errors.add("name", "must not be blank");
        }

        if self.price < BigDecimal::from(0) {
            errors.add("price", "must be at least 0");
        }
        if self.price >= BigDecimal::from(PRICE_LIMIT) {
            errors.add("price", format!("must be less than {}", PRICE_LIMIT));
        }
        if self.price.with_scale(2) != self.price {
            errors.add("price", "must have at most 2 decimal places");
        }

        if !(0..=MAX_REQUIRED_AGE).contains(&self.required_age) {
            errors.add(
                "required_age",
                format!("must be between 0 and {}", MAX_REQUIRED_AGE),
            );
        }
        if let Some(score) = self.metacritic_score {
            if !(0..=MAX_METACRITIC_SCORE).contains(&score) {
                errors.add(
                    "metacritic_score",
                    format!("must be between 0 and {}", MAX_METACRITIC_SCORE),
                );
            }
        }

        let counters = [
            ("estimated_owners", self.estimated_owners),
            ("peak_concurrent_users", self.peak_concurrent_users),
            ("dlc_count", Some(self.dlc_count)),
            ("positive_ratings", self.positive_ratings),
            ("negative_ratings", self.negative_ratings),
            ("achievements", self.achievements),
            ("average_playtime", Some(self.average_playtime)),
            ("median_playtime", Some(self.median_playtime)),
        ];
        for (field, value) in counters {
            if value.is_some_and(|v| v < 0) {
                errors.add(field, "must be at least 0");
            }
        }

        let urls = [
            ("header_image", &self.header_image),
            ("website", &self.website),
            ("support_url", &self.support_url),
            ("metacritic_url", &self.metacritic_url),
        ];
        for (field, value) in urls {
            if let Some(url) = value {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    errors.add(field, "must be an http(s) URL");
                }
            }
        }

        if let Some(email) = &self.support_email {
            let valid = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !valid {
                errors.add("support_email", "must be a valid email address");
            }
        }

        for kind in Association::ALL {
            let names = self.association(kind);
            if names.iter().any(|name| name.is_empty()) {
                errors.add(kind.field(), "names must not be blank");
            }
            if names
                .iter()
                .any(|name| name.chars().count() > kind.max_name_len())
            {
                errors.add(
                    kind.field(),
                    format!("names must be at most {} characters", kind.max_name_len()),
                );
            }
        }
    }

    /// Returns the record itself when every invariant holds
    pub fn validated(self) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        self.check(&mut errors);
        errors.into_result(self)
    }
}

/// Builds an association set from caller-supplied names, trimming each one
pub fn attribute_set<I, S>(names: I) -> AttributeSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().trim().to_string())
        .collect()
}
