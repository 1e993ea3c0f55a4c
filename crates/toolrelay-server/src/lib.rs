//! toolrelay HTTP front end
//!
//! Thin axum layer over [`toolrelay_core::AgentService`]: `POST /generate`
//! streams one JSON line per agent event, `GET /health` reports the tool
//! providers.

pub mod observability;
pub mod routes;
pub mod state;

pub use routes::{router, STREAM_CONTENT_TYPE};
pub use state::AppState;
