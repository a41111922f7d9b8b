pub mod backends;
pub mod config;

pub use backends::{Backend, BackendDirectory};
pub use config::AppConfig;
