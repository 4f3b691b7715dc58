//! Route declarations for a site.
//!
//! # Data Flow
//! ```text
//! SiteConfig + enabled plugins
//!     → plugins: on_start_routes (may claim paths before core)
//!     → core_routes.rs (site-wide, notice, group, tag, settings, user routes)
//!     → plugins: on_routes_initialized (may override core routes)
//!     → RouteTable
//! ```
//!
//! The declaration order is the configuration: it decides which dynamic
//! route is tried first.

pub mod core_routes;
pub mod plugins;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::config::schema::{AppConfig, SiteConfig};
use crate::error::DeclarationError;
use crate::routing::matcher::AcceptMatcher;
use crate::routing::{Fingerprint, RouteTable, Router, RouterCache};

pub use plugins::{plugin_by_name, RouterPlugin};

/// Nickname placeholder constraint.
pub const NICKNAME_PATTERN: &str = "[0-9a-zA-Z_]{1,64}";

/// Numeric id placeholder constraint.
pub const ID_PATTERN: &str = "[0-9]+";

/// Build the full route table for a site.
///
/// `accept` is the negotiated media type the table is built for.
pub fn build_table(
    site: &SiteConfig,
    plugins: &[Arc<dyn RouterPlugin>],
    accept: Option<&str>,
) -> Result<RouteTable, DeclarationError> {
    let mut table = match accept {
        Some(accept) => RouteTable::with_accept(accept),
        None => RouteTable::new(),
    };

    for plugin in plugins {
        plugin.on_start_routes(&mut table)?;
    }

    core_routes::connect_core_routes(&mut table, site)?;

    for plugin in plugins {
        plugin.on_routes_initialized(&mut table)?;
    }

    tracing::debug!(
        static_routes = table.static_count(),
        dynamic_routes = table.dynamic_count(),
        accept = ?accept,
        "Routes initialized"
    );
    Ok(table)
}

/// Fingerprint of the route set a site produces.
pub fn fingerprint(site: &SiteConfig, plugins: &[Arc<dyn RouterPlugin>]) -> Fingerprint {
    let names: Vec<&str> = plugins.iter().map(|p| p.name()).collect();
    Fingerprint::new(site.single_user, &site.version, &names)
}

/// Resolve configured plugin names, skipping (and logging) unknown ones.
pub fn resolve_plugins(names: &[String]) -> Vec<Arc<dyn RouterPlugin>> {
    names
        .iter()
        .filter_map(|name| {
            let plugin = plugin_by_name(name);
            if plugin.is_none() {
                tracing::warn!(plugin = %name, "Unknown plugin; no routes added");
            }
            plugin
        })
        .collect()
}

/// A configured site: settings, plugins and the media types its routes are gated on.
pub struct Site {
    pub config: AppConfig,
    pub plugins: Vec<Arc<dyn RouterPlugin>>,
    gated_types: BTreeSet<String>,
}

impl Site {
    /// Resolve plugins and build the base table once, so declaration errors
    /// surface here instead of on the first request.
    pub fn new(config: AppConfig, cache: &RouterCache) -> Result<Self, DeclarationError> {
        let plugins = resolve_plugins(&config.plugins.enabled);
        let mut site = Self {
            config,
            plugins,
            gated_types: BTreeSet::new(),
        };
        let base = site.router(cache, None)?;
        site.gated_types = base.table().gated_media_types();
        Ok(site)
    }

    /// Pick the gated media type an Accept header asks for, if any.
    pub fn negotiate(&self, accept_header: Option<&str>) -> Option<&str> {
        let header = accept_header?;
        self.gated_types
            .iter()
            .find(|t| AcceptMatcher::new([t.as_str()]).matches(header))
            .map(String::as_str)
    }

    /// Router for a negotiated media type, from the cache when possible.
    pub fn router(
        &self,
        cache: &RouterCache,
        variant: Option<&str>,
    ) -> Result<Router, DeclarationError> {
        let fp = fingerprint(&self.config.site, &self.plugins).with_variant(variant);
        let table = cache.get_or_build(&fp, variant, || {
            build_table(&self.config.site, &self.plugins, variant)
        })?;
        Ok(Router::new(table))
    }
}
