//! Route handlers. Each is a thin adapter over [`Interaction`].

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use relay_core::errors::InteractionError;
use relay_core::messages::{CompletionRequest, CompletionResult};
use relay_llm::{AvailableModels, TokenCount};

use crate::server::AppState;

/// Failure body: `{detail, kind}` with status 500.
///
/// The interaction layer never returns partial results, so every failure
/// surfaces here with its diagnostic intact.
pub struct ApiError(pub InteractionError);

impl From<InteractionError> for ApiError {
    fn from(err: InteractionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "detail": self.0.to_string(),
            "kind": self.0.error_kind(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

pub async fn llm_interaction(
    State(state): State<AppState>,
    Json(request): Json<CompletionRequest>,
) -> Result<Json<CompletionResult>, ApiError> {
    let result = state.interaction.handle(&request).await?;
    Ok(Json(result))
}

pub async fn available_models(State(state): State<AppState>) -> Json<AvailableModels> {
    Json(state.interaction.available_models())
}

#[derive(Debug, Deserialize)]
pub struct CountTokensRequest {
    pub text: String,
    #[serde(default)]
    pub model: Option<String>,
}

pub async fn count_tokens(
    State(state): State<AppState>,
    Json(request): Json<CountTokensRequest>,
) -> Json<TokenCount> {
    Json(
        state
            .interaction
            .count_tokens(&request.text, request.model.as_deref())
            .await,
    )
}

pub async fn health() -> impl IntoResponse {
    Json(json!({"status": "healthy"}))
}
