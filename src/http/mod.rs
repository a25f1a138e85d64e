//! HTTP surface: health, leaderboard, WebSocket upgrade and static assets

pub mod routes;

pub use routes::build_router;
