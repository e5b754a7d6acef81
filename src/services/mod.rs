pub mod catalog;
pub mod filter;
pub mod query;
pub mod recommendations;

pub use catalog::{CatalogService, GameSelector};
pub use filter::GameFilter;
pub use query::{run_query, GameQuery, ListQuery, Page, PageRequest, SortKey, SortOrder, MAX_PAGE_SIZE};
pub use recommendations::{rank_similar, similarity, Recommendation, ScoredGame};
