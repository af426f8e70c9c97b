pub mod book;
pub mod error;
pub mod game;
pub mod ledger;
mod matching;
pub mod types;
pub mod worker;

pub mod prelude {
    pub use super::book::*;
    pub use super::error::*;
    pub use super::game::*;
    pub use super::ledger::*;
    pub use super::types::*;
    pub use super::worker::*;
}
