//! Plugins that contribute routes.
//!
//! A plugin gets two chances to declare routes: before the core routes
//! (`on_start_routes`) and after them (`on_routes_initialized`). Routes
//! declared after the core ones can still take over a core path by
//! declaring the same template again.

use std::sync::Arc;

use crate::bootstrap::{ID_PATTERN, NICKNAME_PATTERN};
use crate::error::DeclarationError;
use crate::routing::{params, Patterns, RouteTable, ACTION};

/// Route hooks for a plugin.
pub trait RouterPlugin: Send + Sync {
    /// Name used in configuration and in the router fingerprint.
    fn name(&self) -> &str;

    /// Declare routes before the core set.
    fn on_start_routes(&self, _table: &mut RouteTable) -> Result<(), DeclarationError> {
        Ok(())
    }

    /// Declare routes after the core set.
    fn on_routes_initialized(&self, _table: &mut RouteTable) -> Result<(), DeclarationError> {
        Ok(())
    }
}

/// Look up a built-in plugin. Names are case-insensitive.
pub fn plugin_by_name(name: &str) -> Option<Arc<dyn RouterPlugin>> {
    match name.to_ascii_lowercase().as_str() {
        "directory" => Some(Arc::new(DirectoryPlugin)),
        "activitypub" => Some(Arc::new(ActivityPubPlugin)),
        _ => None,
    }
}

/// User and group directories.
pub struct DirectoryPlugin;

const DIRECTORY_FILTER: &str = "(all|[a-z0-9]{1})";

impl RouterPlugin for DirectoryPlugin {
    fn name(&self) -> &str {
        "Directory"
    }

    fn on_routes_initialized(&self, table: &mut RouteTable) -> Result<(), DeclarationError> {
        let filter = || params([("filter", DIRECTORY_FILTER)]);

        table.connect(
            "directory/users",
            params([(ACTION, "userdirectory")]),
            Patterns::new(),
        )?;
        table.connect(
            "directory/users/:filter",
            params([(ACTION, "userdirectory")]),
            filter(),
        )?;
        table.connect(
            "groups/:filter",
            params([(ACTION, "groupdirectory")]),
            filter(),
        )?;
        // Take over the core group list.
        table.connect("groups", params([(ACTION, "groupdirectory")]), Patterns::new())
    }
}

/// ActivityStreams documents for federated peers.
pub struct ActivityPubPlugin;

/// Media types ActivityPub peers ask for.
pub const ACTIVITY_TYPES: &[&str] = &["application/activity+json", "application/ld+json"];

impl RouterPlugin for ActivityPubPlugin {
    fn name(&self) -> &str {
        "ActivityPub"
    }

    fn on_start_routes(&self, table: &mut RouteTable) -> Result<(), DeclarationError> {
        let nickname = || params([("nickname", NICKNAME_PATTERN)]);

        // Same paths as the HTML pages, served when a peer negotiates JSON.
        table.connect_with_accept(
            ":nickname",
            params([(ACTION, "apActorProfile")]),
            nickname(),
            ACTIVITY_TYPES,
        )?;
        table.connect_with_accept(
            "notice/:notice",
            params([(ACTION, "apNotice")]),
            params([("notice", ID_PATTERN)]),
            ACTIVITY_TYPES,
        )?;

        for (suffix, action) in [
            ("inbox.json", "apActorInbox"),
            ("outbox.json", "apActorOutbox"),
            ("followers.json", "apActorFollowers"),
            ("following.json", "apActorFollowing"),
            ("liked.json", "apActorLiked"),
        ] {
            table.connect(
                &format!(":nickname/{}", suffix),
                params([(ACTION, action)]),
                nickname(),
            )?;
        }
        table.connect("inbox.json", params([(ACTION, "apSharedInbox")]), Patterns::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::build_table;
    use crate::config::schema::SiteConfig;

    #[test]
    fn test_plugin_lookup() {
        assert_eq!(plugin_by_name("directory").unwrap().name(), "Directory");
        assert_eq!(plugin_by_name("ActivityPub").unwrap().name(), "ActivityPub");
        assert!(plugin_by_name("Realtime").is_none());
    }

    #[test]
    fn test_directory_overrides_group_list() {
        let plugins = vec![plugin_by_name("Directory").unwrap()];
        let table = build_table(&SiteConfig::default(), &plugins, None).unwrap();

        assert_eq!(table.match_path("groups").unwrap()[ACTION], "groupdirectory");
        assert_eq!(table.match_path("group").unwrap()[ACTION], "groups");
        assert_eq!(
            table.match_path("directory/users/a").unwrap(),
            params([(ACTION, "userdirectory"), ("filter", "a")])
        );
        // `directory` is a valid nickname; the core user page still claims it.
        assert_eq!(table.match_path("directory").unwrap()[ACTION], "showstream");
    }

    #[test]
    fn test_activitypub_gate() {
        let plugins = vec![plugin_by_name("ActivityPub").unwrap()];
        let site = SiteConfig::default();

        let html = build_table(&site, &plugins, None).unwrap();
        assert_eq!(html.match_path("notice/7").unwrap()[ACTION], "shownotice");

        let ap = build_table(&site, &plugins, Some("application/ld+json")).unwrap();
        assert_eq!(ap.match_path("notice/7").unwrap()[ACTION], "apNotice");
        assert_eq!(ap.match_path("alice").unwrap()[ACTION], "apActorProfile");

        // Ungated plugin routes match either way and come before `:nickname/...`.
        assert_eq!(
            html.match_path("alice/outbox.json").unwrap(),
            params([(ACTION, "apActorOutbox"), ("nickname", "alice")])
        );

        // Links to the gated routes are available from both tables.
        let args = params([(ACTION, "apNotice"), ("notice", "7")]);
        assert_eq!(html.generate(&args, None, None).unwrap(), "notice/7");
        assert_eq!(ap.generate(&args, None, None).unwrap(), "notice/7");
    }
}
