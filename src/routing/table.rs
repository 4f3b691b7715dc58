//! Route table: registration and forward matching.
//!
//! # Responsibilities
//! - Accept `connect` declarations in bootstrap order
//! - Keep static paths in an exact-match map
//! - Keep dynamic paths as an ordered list of compiled patterns
//! - Keep reverse indices per action for link generation
//!
//! # Design Decisions
//! - Static lookup first, then first dynamic match wins
//! - Re-declaring a template (same path or same compiled pattern) puts the
//!   new entry at the front of the dynamic list, so plugins can override
//!   core routes by declaring them again
//! - Accept-gated routes are also put at the front
//! - Reverse indices ignore the Accept gate: links are always generatable

use std::collections::{BTreeSet, HashMap};

use crate::error::{DeclarationError, RouteError};
use crate::observability::metrics;
use crate::routing::matcher::AcceptMatcher;
use crate::routing::route::{
    placeholder_names, CompiledRoute, Declaration, Format, Params, Patterns, ACTION,
};

#[derive(Debug, Clone)]
pub(crate) struct StaticCandidate {
    pub(crate) args: Params,
    pub(crate) path: String,
}

#[derive(Debug, Clone)]
pub(crate) struct DynamicCandidate {
    pub(crate) args: Params,
    pub(crate) format: Format,
    pub(crate) param_names: Vec<String>,
}

/// The set of routes for one configuration.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    accept: Option<String>,
    statics: HashMap<String, Params>,
    dynamics: Vec<CompiledRoute>,
    pub(crate) reverse_statics: HashMap<String, Vec<StaticCandidate>>,
    pub(crate) reverse_dynamics: HashMap<String, Vec<DynamicCandidate>>,
    all_paths: Vec<String>,
    declarations: Vec<Declaration>,
}

impl RouteTable {
    /// Create an empty table for a request without a negotiated Accept header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table for a request with the given Accept header.
    pub fn with_accept(accept: impl Into<String>) -> Self {
        Self {
            accept: Some(accept.into()),
            ..Self::default()
        }
    }

    /// Rebuild a table from a declaration log.
    pub fn replay<I>(declarations: I, accept: Option<&str>) -> Result<Self, DeclarationError>
    where
        I: IntoIterator<Item = Declaration>,
    {
        let mut table = match accept {
            Some(accept) => Self::with_accept(accept),
            None => Self::new(),
        };
        for declaration in declarations {
            table.declare(declaration)?;
        }
        Ok(table)
    }

    pub fn accept_header(&self) -> Option<&str> {
        self.accept.as_deref()
    }

    /// Register a route.
    pub fn connect(
        &mut self,
        path: &str,
        args: Params,
        patterns: Patterns,
    ) -> Result<(), DeclarationError> {
        self.declare(Declaration::new(path, args).with_patterns(patterns))
    }

    /// Register a route that only matches when the request accepts one of `media_types`.
    pub fn connect_with_accept(
        &mut self,
        path: &str,
        args: Params,
        patterns: Patterns,
        media_types: &[&str],
    ) -> Result<(), DeclarationError> {
        self.declare(
            Declaration::new(path, args)
                .with_patterns(patterns)
                .with_accept(media_types),
        )
    }

    /// Register a declaration.
    pub fn declare(&mut self, declaration: Declaration) -> Result<(), DeclarationError> {
        let action = declaration
            .action()
            .ok_or_else(|| DeclarationError::MissingAction {
                path: declaration.path.clone(),
            })?
            .to_string();

        let gate = AcceptMatcher::new(&declaration.accept);
        let forward = gate.admits(self.accept.as_deref());
        let path = declaration.path.clone();

        let names = placeholder_names(&path);
        if names.is_empty() {
            if forward {
                self.statics.insert(path.clone(), declaration.args.clone());
            }
            self.reverse_statics
                .entry(action)
                .or_default()
                .push(StaticCandidate {
                    args: declaration.args.clone(),
                    path: path.clone(),
                });
        } else {
            let mut args = declaration.args.clone();
            let mut patterns = declaration.patterns.clone();

            // Older declarations pass placeholder patterns inside args.
            for name in &names {
                if name == ACTION || patterns.contains_key(name) {
                    continue;
                }
                if let Some(pattern) = args.remove(name) {
                    patterns.insert(name.clone(), pattern);
                }
            }

            let route = CompiledRoute::compile(&path, args.clone(), names.clone(), &patterns)?;

            if forward {
                let seen = self
                    .dynamics
                    .iter()
                    .any(|r| r.source() == route.source() || r.path() == route.path());
                if seen || !gate.is_unconditional() {
                    tracing::debug!(path = %path, pattern = %route.source(), "Route takes precedence over earlier declarations");
                    self.dynamics.insert(0, route);
                } else {
                    self.dynamics.push(route);
                }
            }

            self.reverse_dynamics
                .entry(action)
                .or_default()
                .push(DynamicCandidate {
                    args,
                    format: Format::parse(&path),
                    param_names: names,
                });
        }

        if !forward {
            tracing::trace!(path = %path, accept = ?declaration.accept, "Route registered for link generation only");
        }

        if !self.all_paths.contains(&path) {
            self.all_paths.push(path);
        }
        self.declarations.push(declaration);
        Ok(())
    }

    /// Find the route for a request path.
    ///
    /// The path must not carry a query string.
    pub fn match_path(&self, path: &str) -> Result<Params, RouteError> {
        if let Some(args) = self.statics.get(path) {
            metrics::record_match("static");
            return Ok(args.clone());
        }

        for route in &self.dynamics {
            if let Some(params) = route.captures(path) {
                metrics::record_match("dynamic");
                return Ok(params);
            }
        }

        metrics::record_match("none");
        Err(RouteError::NoRoute {
            path: path.to_string(),
        })
    }

    /// Every declared path, in declaration order, without duplicates.
    pub fn paths(&self) -> &[String] {
        &self.all_paths
    }

    /// The declaration log.
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Dynamic routes in matching order.
    pub fn dynamic_routes(&self) -> impl Iterator<Item = &CompiledRoute> {
        self.dynamics.iter()
    }

    pub fn static_count(&self) -> usize {
        self.statics.len()
    }

    pub fn dynamic_count(&self) -> usize {
        self.dynamics.len()
    }

    /// Action identifiers with at least one route.
    pub fn actions(&self) -> BTreeSet<&str> {
        self.reverse_statics
            .keys()
            .chain(self.reverse_dynamics.keys())
            .map(String::as_str)
            .collect()
    }

    /// Every media type some declaration is gated on.
    pub fn gated_media_types(&self) -> BTreeSet<String> {
        self.declarations
            .iter()
            .flat_map(|d| d.accept.iter())
            .map(|t| t.to_ascii_lowercase())
            .collect()
    }
}
