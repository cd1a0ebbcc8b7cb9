//! HTTP gateway for the Pinhole URL shortener.
//!
//! Exposes the shortening and resolution services over axum:
//! `POST /shorten`, `GET /{short_code}` and `GET /health`.

pub mod app;
pub mod error;
pub mod handlers;
pub mod model;
pub mod state;

pub use app::App;
pub use state::AppState;
