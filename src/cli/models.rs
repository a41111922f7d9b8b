use crate::cli::render;
use crate::core::AppConfig;

pub fn run(config: &AppConfig) {
    println!("{}", render::backends(&config.backends, config.default_backend()));
}
