//! dialflow library
//!
//! Outbound campaign execution service: a Postgres-backed campaign store
//! and HTTP control surface plus a background engine pacing voice, SMS and
//! email dispatch against calling windows and daily caps.

use shadow_rs::shadow;
shadow!(build);

pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod external;
pub mod logger;
pub mod models;
pub mod repositories;
pub mod schema;
pub mod server;
pub mod services;
pub mod state;
pub mod utils;

pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
