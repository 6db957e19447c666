pub mod archive;
pub mod config;
pub mod extract;
pub mod http_client;
pub mod record;
pub mod registry;
pub mod result_cache;
pub mod results_fetch;
pub mod season_config;
pub mod source;
pub mod standings;
pub mod state;
