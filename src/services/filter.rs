use crate::models::{Game, Platform};

/// Predicates parsed from a `filterBy` expression such as
/// `genre(Action,RPG)platform(windows)year(2021,2022)`.
///
/// Values inside one clause are OR-ed, distinct clauses are AND-ed and an
/// empty clause constrains nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameFilter {
    /// Lowercased genre fragments
    pub genres: Vec<String>,
    pub platforms: Vec<Platform>,
    pub years: Vec<i32>,
}

/// One `keyword(body)` occurrence in a filter expression
#[derive(Debug, PartialEq, Eq)]
struct Clause<'a> {
    keyword: &'a str,
    body: &'a str,
}

impl GameFilter {
    pub fn parse(expr: &str) -> Self {
        let mut filter = Self::default();

        for clause in clauses(expr) {
            let values = split_values(clause.body);
            match clause.keyword.to_ascii_lowercase().as_str() {
                "genre" => filter
                    .genres
                    .extend(values.into_iter().map(str::to_lowercase)),
                "platform" => {
                    for platform in values.into_iter().filter_map(|v| v.parse().ok()) {
                        if !filter.platforms.contains(&platform) {
                            filter.platforms.push(platform);
                        }
                    }
                }
                "year" => filter
                    .years
                    .extend(values.into_iter().filter_map(|v| v.parse::<i32>().ok())),
                other => {
                    tracing::debug!(keyword = %other, "Ignoring unknown filter clause");
                }
            }
        }

        filter
    }

    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.platforms.is_empty() && self.years.is_empty()
    }

    pub fn matches(&self, game: &Game) -> bool {
        self.matches_genre(game) && self.matches_platform(game) && self.matches_year(game)
    }

    fn matches_genre(&self, game: &Game) -> bool {
        if self.genres.is_empty() {
            return true;
        }
        game.data.genres.iter().any(|genre| {
            let genre = genre.to_lowercase();
            self.genres.iter().any(|wanted| genre.contains(wanted.as_str()))
        })
    }

    fn matches_platform(&self, game: &Game) -> bool {
        self.platforms.is_empty() || self.platforms.iter().any(|p| game.supports(*p))
    }

    fn matches_year(&self, game: &Game) -> bool {
        self.years.is_empty() || self.years.contains(&game.release_year())
    }
}

/// Scans `expr` for `identifier(...)` clauses.
///
/// A clause body ends at its matching parenthesis, so nested parentheses stay
/// inside the body. An unterminated clause runs to the end of the input.
fn clauses(expr: &str) -> Vec<Clause<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = expr[cursor..].find('(') {
        let open = cursor + offset;
        let head = &expr[cursor..open];
        let keyword_start = head
            .char_indices()
            .rev()
            .take_while(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
            .last()
            .map(|(idx, _)| idx)
            .unwrap_or(head.len());
        let keyword = &head[keyword_start..];

        let mut depth = 0usize;
        let mut close = None;
        for (idx, c) in expr[open..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(open + idx);
                        break;
                    }
                }
                _ => {}
            }
        }

        let (body, next) = match close {
            Some(close) => (&expr[open + 1..close], close + 1),
            None => (&expr[open + 1..], expr.len()),
        };

        if !keyword.is_empty() {
            found.push(Clause { keyword, body });
        }
        cursor = next;
    }

    found
}

/// Splits a clause body on top-level commas, trimming and dropping empty values
fn split_values(body: &str) -> Vec<&str> {
    let mut values = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (idx, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                values.push(&body[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    values.push(&body[start..]);

    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect()
}
