//! Reverse generation: action + arguments -> path.
//!
//! Candidates for an action are tried dynamic first, then static, each in
//! declaration order. A candidate accepts the caller's arguments when every
//! fixed argument it was declared with is present and loosely equal, and
//! (for dynamic candidates) every placeholder has a value.

use url::form_urlencoded;

use crate::error::RouteError;
use crate::observability::metrics;
use crate::routing::route::{loose_eq, Params, ACTION};
use crate::routing::table::RouteTable;

impl RouteTable {
    /// Build a path for `args`, with an optional query string and fragment.
    pub fn generate(
        &self,
        args: &Params,
        query: Option<&Params>,
        fragment: Option<&str>,
    ) -> Result<String, RouteError> {
        let action = args.get(ACTION).ok_or(RouteError::MissingAction)?;

        let dynamics = self.reverse_dynamics.get(action);
        let statics = self.reverse_statics.get(action);
        if dynamics.is_none() && statics.is_none() {
            metrics::record_generate("unknown_action");
            return Err(RouteError::UnknownAction {
                action: action.clone(),
            });
        }

        let from_dynamic = dynamics.into_iter().flatten().find_map(|candidate| {
            if !defaults_satisfied(&candidate.args, args) {
                return None;
            }
            let values = candidate
                .param_names
                .iter()
                .map(|name| args.get(name).map(String::as_str))
                .collect::<Option<Vec<&str>>>()?;
            Some(candidate.format.render(&values))
        });

        let path = from_dynamic.or_else(|| {
            statics
                .into_iter()
                .flatten()
                .find(|candidate| defaults_satisfied(&candidate.args, args))
                .map(|candidate| candidate.path.clone())
        });

        let Some(mut url) = path else {
            metrics::record_generate("no_match");
            return Err(RouteError::NoMatchingParams {
                action: action.clone(),
                args: encode_pairs(args),
            });
        };

        if let Some(query) = query.filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(&encode_pairs(query));
        }

        let mut url = repair_query(url);

        if let Some(fragment) = fragment.filter(|f| !f.is_empty()) {
            url.push('#');
            url.push_str(fragment);
        }

        metrics::record_generate("ok");
        Ok(url)
    }
}

fn defaults_satisfied(declared: &Params, requested: &Params) -> bool {
    declared.iter().all(|(key, value)| {
        requested
            .get(key)
            .is_some_and(|requested| loose_eq(requested, value))
    })
}

fn encode_pairs(pairs: &Params) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish()
}

/// Normalize a query string chained as `?a=1?b=2` into `?a=1&b=2`.
///
/// Also turns `&amp;` separators after the first `?` back into `&`.
/// Percent-encoded characters are left alone.
pub fn repair_query(url: String) -> String {
    let Some(qpos) = url.find('?') else {
        return url;
    };
    let (head, tail) = url.split_at(qpos + 1);
    let tail = tail.replace('?', "&").replace("&amp;", "&");
    format!("{head}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::{params, Patterns};

    fn table() -> RouteTable {
        let mut table = RouteTable::new();
        table
            .connect(
                "group/:nickname/members",
                params([("action", "groupmembers")]),
                Patterns::new(),
            )
            .unwrap();
        table
            .connect("group", params([("action", "groups")]), Patterns::new())
            .unwrap();
        table
            .connect(
                "api/statuses/user_timeline/:id.:format",
                params([("action", "ApiTimelineUser")]),
                params([("format", "(xml|json|rss|atom|as)")]),
            )
            .unwrap();
        table
            .connect(
                "api/statusnet/config.:format",
                params([("action", "ApiGNUsocialConfig"), ("version", "1")]),
                params([("format", "(xml|json)")]),
            )
            .unwrap();
        table
            .connect(
                "feed/:nickname",
                params([("action", "userfeed"), ("type", "atom")]),
                Patterns::new(),
            )
            .unwrap();
        table
            .connect(
                "rss/:nickname",
                params([("action", "userfeed"), ("type", "rss")]),
                Patterns::new(),
            )
            .unwrap();
        table
            .connect("main/all", params([("action", "userfeed")]), Patterns::new())
            .unwrap();
        table
    }

    #[test]
    fn test_generate_dynamic() {
        let table = table();
        let url = table
            .generate(&params([("action", "groupmembers"), ("nickname", "acme")]), None, None)
            .unwrap();
        assert_eq!(url, "group/acme/members");
    }

    #[test]
    fn test_generate_static() {
        let table = table();
        let url = table
            .generate(&params([("action", "groups")]), None, None)
            .unwrap();
        assert_eq!(url, "group");
    }

    #[test]
    fn test_generate_multiple_slots() {
        let table = table();
        let url = table
            .generate(
                &params([("action", "ApiTimelineUser"), ("id", "7"), ("format", "json")]),
                None,
                None,
            )
            .unwrap();
        assert_eq!(url, "api/statuses/user_timeline/7.json");
    }

    #[test]
    fn test_fixed_args_select_candidate() {
        let table = table();
        let rss = table
            .generate(
                &params([("action", "userfeed"), ("nickname", "bob"), ("type", "rss")]),
                None,
                None,
            )
            .unwrap();
        assert_eq!(rss, "rss/bob");

        let atom = table
            .generate(
                &params([("action", "userfeed"), ("nickname", "bob"), ("type", "atom")]),
                None,
                None,
            )
            .unwrap();
        assert_eq!(atom, "feed/bob");

        // No dynamic candidate fits without a type; the static one does.
        let fallback = table
            .generate(&params([("action", "userfeed")]), None, None)
            .unwrap();
        assert_eq!(fallback, "main/all");
    }

    #[test]
    fn test_unknown_action() {
        let table = table();
        let err = table
            .generate(&params([("action", "unknownAction")]), None, None)
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::UnknownAction {
                action: "unknownAction".into()
            }
        );
    }

    #[test]
    fn test_missing_action() {
        let table = table();
        let err = table
            .generate(&params([("nickname", "acme")]), None, None)
            .unwrap_err();
        assert_eq!(err, RouteError::MissingAction);
    }

    #[test]
    fn test_no_matching_params_lists_arguments() {
        let table = table();
        let err = table
            .generate(&params([("action", "groupmembers"), ("id", "3")]), None, None)
            .unwrap_err();
        assert_eq!(
            err,
            RouteError::NoMatchingParams {
                action: "groupmembers".into(),
                args: "action=groupmembers&id=3".into(),
            }
        );
    }

    #[test]
    fn test_fixed_arg_loose_equality() {
        let table = table();
        let url = table
            .generate(
                &params([("action", "ApiGNUsocialConfig"), ("version", "01"), ("format", "xml")]),
                None,
                None,
            )
            .unwrap();
        assert_eq!(url, "api/statusnet/config.xml");

        let err = table
            .generate(
                &params([("action", "ApiGNUsocialConfig"), ("version", "2"), ("format", "xml")]),
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, RouteError::NoMatchingParams { .. }));
    }

    #[test]
    fn test_query_and_fragment() {
        let table = table();
        let url = table
            .generate(
                &params([("action", "groups")]),
                Some(&params([("page", "2"), ("q", "a b&c")])),
                Some("members"),
            )
            .unwrap();
        assert_eq!(url, "group?page=2&q=a+b%26c#members");
    }

    #[test]
    fn test_multiple_query_params_have_single_question_mark() {
        let table = table();
        let url = table
            .generate(
                &params([("action", "groupmembers"), ("nickname", "acme")]),
                Some(&params([("a", "1"), ("b", "2"), ("c", "?")])),
                None,
            )
            .unwrap();
        assert_eq!(url.matches('?').count(), 1);
        assert_eq!(url, "group/acme/members?a=1&b=2&c=%3F");
    }

    #[test]
    fn test_empty_query_is_omitted() {
        let table = table();
        let url = table
            .generate(&params([("action", "groups")]), Some(&Params::new()), Some(""))
            .unwrap();
        assert_eq!(url, "group");
    }

    #[test]
    fn test_repair_query() {
        assert_eq!(repair_query("a?p1=v1?p2=v2?p3=v3".into()), "a?p1=v1&p2=v2&p3=v3");
        assert_eq!(repair_query("a?p1=v1&amp;p2=v2".into()), "a?p1=v1&p2=v2");
        assert_eq!(repair_query("a/b".into()), "a/b");
    }
}
