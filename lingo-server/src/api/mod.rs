//! HTTP handlers for lingo-server

pub mod auth;
pub mod buildinfo;
pub mod health;
pub mod pages;
pub mod providers;
pub mod sentences;
pub mod ui;
pub mod voices;

pub use buildinfo::get_build_info;
pub use health::health_routes;
pub use providers::get_providers;
pub use ui::serve_style_css;
