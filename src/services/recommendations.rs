use serde::Serialize;

use crate::models::{AttributeSet, Game, GameData};

/// How many similar games a recommendation returns at most
pub const RECOMMENDATION_LIMIT: usize = 5;

const GENRE_WEIGHT: usize = 3;
const TAG_WEIGHT: usize = 2;
const CATEGORY_WEIGHT: usize = 1;

/// A candidate game together with its similarity to the reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredGame {
    pub score: usize,
    #[serde(flatten)]
    pub game: Game,
}

/// Response body for the recommendation endpoint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub reference_game: Game,
    pub recommended_games: Vec<ScoredGame>,
}

fn overlap(a: &AttributeSet, b: &AttributeSet) -> usize {
    a.intersection(b).count()
}

/// Weighted count of shared genres, tags and categories (exact name equality)
pub fn similarity(reference: &GameData, candidate: &GameData) -> usize {
    GENRE_WEIGHT * overlap(&reference.genres, &candidate.genres)
        + TAG_WEIGHT * overlap(&reference.tags, &candidate.tags)
        + CATEGORY_WEIGHT * overlap(&reference.categories, &candidate.categories)
}

/// Ranks `catalog` by similarity to `reference`.
///
/// The reference itself and games sharing nothing with it are left out. Equal
/// scores keep catalog order, so with an id-ordered catalog the lower id wins.
pub fn rank_similar<I>(reference: &Game, catalog: I, limit: usize) -> Vec<ScoredGame>
where
    I: IntoIterator<Item = Game>,
{
    let mut scored: Vec<ScoredGame> = catalog
        .into_iter()
        .filter(|candidate| candidate.id != reference.id)
        .filter_map(|candidate| {
            let score = similarity(&reference.data, &candidate.data);
            (score > 0).then_some(ScoredGame {
                score,
                game: candidate,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(limit);
    scored
}
