pub mod core;
pub mod models;

pub use self::core::ChatSession;
pub use models::{ChatTurn, Role, Transcript};
