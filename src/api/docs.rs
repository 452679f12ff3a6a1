use axum::Json;
use utoipa::OpenApi;

use crate::api::handlers;
use crate::items::ItemList;

#[derive(OpenApi)]
#[openapi(
    info(title = "Prototype Boilerplate API", version = "0.1.0"),
    paths(
        handlers::root,
        handlers::list_items,
        handlers::list_secure_items,
        handlers::db_check,
        handlers::create_completion,
        handlers::stream_completion,
    ),
    components(schemas(
        ItemList,
        handlers::MessageResponse,
        handlers::ErrorResponse,
        handlers::DbCheckResponse,
        handlers::CompletionRequest,
        handlers::CompletionResponse,
    ))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
