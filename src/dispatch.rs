//! Action registry: matched route parameters to a handler.
//!
//! Actions are registered by identifier at startup as factories; every
//! dispatch builds a fresh action instance, so actions may keep
//! per-request state without synchronization.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::routing::{Params, Router, ACTION};
use crate::stream::IdStream;

/// Raised while resolving or running an action.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown action \"{action}\"")]
    UnknownAction { action: String },

    #[error("Action \"{action}\" failed: {reason}")]
    Failed { action: String, reason: String },
}

/// What an action sees of the request.
pub struct ActionContext<'a> {
    pub action: &'a str,
    pub params: &'a Params,
    pub query: &'a Params,
    pub router: &'a Router,
}

/// Status and JSON body produced by an action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionOutput {
    pub status: StatusCode,
    pub body: Value,
}

impl ActionOutput {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }
}

impl IntoResponse for ActionOutput {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// A request handler.
pub trait Action: Send {
    fn handle(&mut self, ctx: &ActionContext<'_>) -> Result<ActionOutput, DispatchError>;
}

type ActionFactory = Arc<dyn Fn() -> Box<dyn Action> + Send + Sync>;

/// Action identifier to handler factory.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    factories: HashMap<String, ActionFactory>,
    fallback: Option<ActionFactory>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory for `action`. A later registration replaces an earlier one.
    pub fn register<F, A>(&mut self, action: impl Into<String>, factory: F)
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Action + 'static,
    {
        self.factories
            .insert(action.into(), Arc::new(move || Box::new(factory()) as Box<dyn Action>));
    }

    /// Handler for routed actions with no registration of their own.
    pub fn register_fallback<F, A>(&mut self, factory: F)
    where
        F: Fn() -> A + Send + Sync + 'static,
        A: Action + 'static,
    {
        self.fallback = Some(Arc::new(move || Box::new(factory()) as Box<dyn Action>));
    }

    pub fn contains(&self, action: &str) -> bool {
        self.factories.contains_key(action)
    }

    /// Build a handler for `action`.
    pub fn resolve(&self, action: &str) -> Result<Box<dyn Action>, DispatchError> {
        self.factories
            .get(action)
            .or(self.fallback.as_ref())
            .map(|factory| factory())
            .ok_or_else(|| DispatchError::UnknownAction {
                action: action.to_string(),
            })
    }

    /// Run the action named by `params`.
    pub fn dispatch(
        &self,
        router: &Router,
        params: &Params,
        query: &Params,
    ) -> Result<ActionOutput, DispatchError> {
        let action = params
            .get(ACTION)
            .ok_or_else(|| DispatchError::UnknownAction {
                action: String::new(),
            })?;

        let mut handler = self.resolve(action)?;
        tracing::debug!(action = %action, "Dispatching");

        handler.handle(&ActionContext {
            action,
            params,
            query,
            router,
        })
    }
}

/// Describes the matched route: action, parameters and canonical link.
#[derive(Debug, Default)]
pub struct RouteInfoAction;

impl Action for RouteInfoAction {
    fn handle(&mut self, ctx: &ActionContext<'_>) -> Result<ActionOutput, DispatchError> {
        let link = ctx.router.table().generate(ctx.params, None, None).ok();
        Ok(ActionOutput::ok(json!({
            "action": ctx.action,
            "params": ctx.params,
            "query": ctx.query,
            "link": link,
        })))
    }
}

/// Notices shown per timeline page.
pub const NOTICES_PER_PAGE: usize = 20;

/// A paged notice timeline over an id stream.
pub struct TimelineAction {
    stream: Arc<dyn IdStream>,
}

impl TimelineAction {
    pub fn new(stream: Arc<dyn IdStream>) -> Self {
        Self { stream }
    }
}

impl Action for TimelineAction {
    fn handle(&mut self, ctx: &ActionContext<'_>) -> Result<ActionOutput, DispatchError> {
        let page = ctx
            .query
            .get("page")
            .and_then(|p| p.parse::<usize>().ok())
            .filter(|p| *p > 0)
            .unwrap_or(1);

        // Pages whose offset does not fit are past the end of any stream.
        let mut ids = match (page - 1).checked_mul(NOTICES_PER_PAGE) {
            // One extra id tells whether a next page exists.
            Some(offset) => self
                .stream
                .ids(offset, Some(NOTICES_PER_PAGE + 1), None, None)
                .map_err(|e| DispatchError::Failed {
                    action: ctx.action.to_string(),
                    reason: e.to_string(),
                })?,
            None => Vec::new(),
        };
        let next_page = page.checked_add(1).filter(|_| ids.len() > NOTICES_PER_PAGE);
        ids.truncate(NOTICES_PER_PAGE);

        let next = if let Some(next_page) = next_page {
            let mut args = ctx.params.clone();
            args.remove(ACTION);
            let next_page = next_page.to_string();
            let query = crate::routing::params([("page", next_page.as_str())]);
            ctx.router
                .build(ctx.action, Some(&args), Some(&query), None)
                .ok()
        } else {
            None
        };

        Ok(ActionOutput::ok(json!({
            "action": ctx.action,
            "page": page,
            "notices": ids,
            "next": next,
        })))
    }
}
