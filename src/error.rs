//! Error types shared across the router.
//!
//! Declaration errors happen while a route table is being built and abort
//! bootstrap. Route errors happen per request and are recoverable by the
//! caller: `NoRoute` becomes a 404, the generation errors point at a
//! programming mistake in whatever asked for the link.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::dispatch::DispatchError;

/// Raised while registering a route.
#[derive(Error, Debug)]
pub enum DeclarationError {
    /// Every route needs an `action` argument.
    #[error("Can't connect '{path}'; path has no action")]
    MissingAction { path: String },

    /// A placeholder pattern did not compile.
    #[error("Invalid pattern for route '{path}': {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },
}

/// Raised by forward matching and reverse generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No static or dynamic route matched the path.
    #[error("No route found for path '{path}'")]
    NoRoute { path: String },

    /// Generation was asked for a link without an `action` argument.
    #[error("Every path needs an action")]
    MissingAction,

    /// Nothing is registered for the action.
    #[error("No candidate paths for action \"{action}\"")]
    UnknownAction { action: String },

    /// Candidates exist but none accepts the supplied arguments.
    #[error("No matches for action \"{action}\" with arguments \"{args}\"")]
    NoMatchingParams { action: String, args: String },

    /// The generated path could not be joined onto the site base URL.
    #[error("Cannot build URL for '{path}': {reason}")]
    InvalidUrl { path: String, reason: String },
}

/// Request-level error returned by the front controller.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Route(RouteError::NoRoute { .. }) => StatusCode::NOT_FOUND,
            AppError::Dispatch(DispatchError::UnknownAction { .. }) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "status": status.as_u16(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
