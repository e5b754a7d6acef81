pub mod game;
pub mod payload;

pub use game::{attribute_set, Association, AttributeSet, Game, GameData, Platform};
pub use payload::{GamePatch, NewGame};
