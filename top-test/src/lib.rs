//! In-process HTTP testing for axum routers.

mod app;

pub use app::{json_pointer, TestApp, TestRequest, TestResponse};
