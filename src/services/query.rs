use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::Game;

use super::filter::GameFilter;

/// Page size used when the caller does not ask for one, and the largest allowed
pub const MAX_PAGE_SIZE: usize = 100;

/// Raw list parameters as they arrive on the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub filter_by: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Fields a listing can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    MetacriticScore,
    Price,
    ReleaseDate,
}

impl SortKey {
    /// Unknown keys yield `None`, which keeps the natural order
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "metacriticscore" => Some(SortKey::MetacriticScore),
            "price" => Some(SortKey::Price),
            "releasedate" => Some(SortKey::ReleaseDate),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Only an explicit `asc` sorts ascending
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some(value) if value.trim().eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    }
}

/// Orders games in place. The sort is stable, so ties keep their current order.
/// Games without a metacritic score come last in either direction.
pub fn sort_games(games: &mut [Game], key: SortKey, order: SortOrder) {
    games.sort_by(|a, b| match key {
        SortKey::MetacriticScore => match (a.data.metacritic_score, b.data.metacritic_score) {
            (Some(x), Some(y)) => order.apply(x.cmp(&y)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Price => order.apply(a.data.price.cmp(&b.data.price)),
        SortKey::ReleaseDate => order.apply(a.data.release_date.cmp(&b.data.release_date)),
    });
}

/// A 1-indexed page request, already clamped to valid bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

fn positive(raw: Option<&str>) -> Option<usize> {
    raw?.trim().parse::<usize>().ok().filter(|n| *n > 0)
}

impl PageRequest {
    /// Falls back to defaults for anything that is not a positive integer
    pub fn parse(page: Option<&str>, page_size: Option<&str>) -> Self {
        Self {
            page: positive(page).unwrap_or(1),
            page_size: positive(page_size)
                .map(|size| size.min(MAX_PAGE_SIZE))
                .unwrap_or(MAX_PAGE_SIZE),
        }
    }

    /// Index of the first record on this page
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let count = items.len();
        let results: Vec<T> = items
            .into_iter()
            .skip(self.offset())
            .take(self.page_size)
            .collect();

        self.page_of(count, results)
    }

    /// Wraps an already sliced page given the size of the whole match set
    pub fn page_of<T>(&self, count: usize, results: Vec<T>) -> Page<T> {
        Page {
            count,
            next: (self.offset().saturating_add(self.page_size) < count).then(|| self.page + 1),
            previous: (self.page > 1).then(|| self.page - 1),
            results,
        }
    }
}

/// One page of a listing plus the size of the whole match set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<usize>,
    pub previous: Option<usize>,
    pub results: Vec<T>,
}

/// A listing request with every parameter already interpreted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameQuery {
    pub filter: GameFilter,
    /// `None` keeps id order
    pub sort: Option<(SortKey, SortOrder)>,
    pub page: PageRequest,
}

impl GameQuery {
    pub fn from_params(params: &ListQuery) -> Self {
        let filter = params
            .filter_by
            .as_deref()
            .map(GameFilter::parse)
            .unwrap_or_default();
        let sort = params
            .sort_by
            .as_deref()
            .and_then(SortKey::parse)
            .map(|key| (key, SortOrder::parse(params.sort_order.as_deref())));

        Self {
            filter,
            sort,
            page: PageRequest::parse(params.page.as_deref(), params.page_size.as_deref()),
        }
    }
}

/// Filters, sorts and paginates `games`, which must be in ascending id order
pub fn run_query(games: Vec<Game>, query: &GameQuery) -> Page<Game> {
    let mut matched: Vec<Game> = if query.filter.is_empty() {
        games
    } else {
        games
            .into_iter()
            .filter(|g| query.filter.matches(g))
            .collect()
    };

    if let Some((key, order)) = query.sort {
        sort_games(&mut matched, key, order);
    }

    tracing::debug!(
        matched = matched.len(),
        page = query.page.page,
        page_size = query.page.page_size,
        "Catalog query evaluated"
    );

    query.page.paginate(matched)
}
