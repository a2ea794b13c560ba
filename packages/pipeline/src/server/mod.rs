//! HTTP control surface. Every pipeline component is invoked through a
//! POST endpoint here, by the scheduler or by an operator.

pub mod app;
pub mod middleware;
pub mod routes;

pub use app::{build_app, AppState};
