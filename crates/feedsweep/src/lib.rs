pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

use crate::infra::config::Config;

pub fn init(config: &Config) {
    infra::logging::init(config.logging.debug());
}
