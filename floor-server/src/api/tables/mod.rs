//! Dining Table API 模块

mod handler;

use axum::{Router, routing::get, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/tables", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list).post(handler::create))
        .route("/free", get(handler::list_free))
        .route("/{table_no}/release", post(handler::release))
        .route("/{table_no}/settle", post(handler::settle))
}
