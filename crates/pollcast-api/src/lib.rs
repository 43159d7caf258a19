pub mod error;
pub mod middleware;
pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use pollcast_core::AppState;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/polls",
            get(routes::polls::list_my_polls).post(routes::polls::create_poll),
        )
        .route(
            "/api/polls/{poll_id}",
            get(routes::polls::get_poll)
                .patch(routes::polls::update_duration)
                .delete(routes::polls::archive_poll),
        )
        .route("/api/polls/{poll_id}/{option_id}", post(routes::polls::vote))
        .route("/api/push", post(routes::push::publish))
        .route("/api/config", get(routes::config::public_config))
}
