//! Core route declarations.

use crate::bootstrap::{ID_PATTERN, NICKNAME_PATTERN};
use crate::config::schema::SiteConfig;
use crate::error::DeclarationError;
use crate::routing::{params, Params, Patterns, RouteTable, ACTION};

/// Hashtag placeholder constraint.
pub const TAG_PATTERN: &str = r"[\pL\pN_\-\.]{1,64}";

/// API response formats.
pub const API_FORMAT_PATTERN: &str = "(xml|json|rss|atom|as)";

/// User pages: path suffix and action.
const USER_PAGES: &[(&str, &str)] = &[
    ("all/rss", "allrss"),
    ("all", "all"),
    ("subscriptions", "subscriptions"),
    ("subscribers", "subscribers"),
    ("replies", "replies"),
    ("favorites", "showfavorites"),
    ("foaf", "foaf"),
    ("rss", "userrss"),
];

/// Group pages under `group/:nickname/`.
const GROUP_PAGES: &[(&str, &str)] = &[
    ("edit", "editgroup"),
    ("join", "joingroup"),
    ("leave", "leavegroup"),
    ("members", "groupmembers"),
    ("blocked", "blockedfromgroup"),
    ("logo", "grouplogo"),
    ("rss", "grouprss"),
];

fn action(name: &str) -> Params {
    params([(ACTION, name)])
}

fn with_nickname(name: &str, nickname: &str) -> Params {
    params([(ACTION, name), ("nickname", nickname)])
}

/// Declare every core route, in matching order.
pub fn connect_core_routes(t: &mut RouteTable, site: &SiteConfig) -> Result<(), DeclarationError> {
    let none = Patterns::new;
    let id = |name: &str| params([(name, ID_PATTERN)]);
    let nickname = || params([("nickname", NICKNAME_PATTERN)]);

    // Account and relationship actions
    for (path, name) in [
        ("main/login", "login"),
        ("main/logout", "logout"),
        ("main/register", "register"),
        ("main/recoverpassword", "recoverpassword"),
        ("main/subscribe", "subscribe"),
        ("main/unsubscribe", "unsubscribe"),
        ("main/block", "block"),
        ("main/unblock", "unblock"),
        ("main/favor", "favor"),
        ("main/disfavor", "disfavor"),
        ("main/tagprofile", "tagprofile"),
    ] {
        t.connect(path, action(name), none())?;
    }
    t.connect("main/register/:code", action("register"), none())?;
    t.connect("main/recoverpassword/:code", action("recoverpassword"), none())?;
    t.connect(
        "main/confirmaddress/:code",
        action("confirmaddress"),
        params([("code", "[0-9a-zA-Z]+")]),
    )?;
    t.connect("main/tagprofile/:id", action("tagprofile"), id("id"))?;
    t.connect("doc/:title", action("doc"), params([("title", "[a-z]+")]))?;

    // Settings
    for page in ["profile", "avatar", "password", "email", "url"] {
        t.connect(
            &format!("settings/{}", page),
            action(&format!("{}settings", page)),
            none(),
        )?;
    }

    // Search
    t.connect("search/people", action("peoplesearch"), none())?;
    t.connect("search/notice", action("noticesearch"), none())?;
    t.connect("search/notice/rss", action("noticesearchrss"), none())?;
    t.connect("search/group", action("groupsearch"), none())?;

    // Notices and conversations
    t.connect("notice/new", action("newnotice"), none())?;
    t.connect("notice/:notice", action("shownotice"), id("notice"))?;
    t.connect("notice/delete/:notice", action("deletenotice"), id("notice"))?;
    t.connect("conversation/:id", action("conversation"), id("id"))?;
    t.connect("attachment/:attachment", action("attachment"), id("attachment"))?;
    t.connect(
        "attachment/:attachment/thumbnail",
        action("attachment_thumbnail"),
        id("attachment"),
    )?;

    // Tags
    t.connect("tag", action("publictagcloud"), none())?;
    t.connect("tag/:tag/rss", action("tagrss"), params([("tag", TAG_PATTERN)]))?;
    t.connect("tag/:tag", action("tag"), params([("tag", TAG_PATTERN)]))?;
    t.connect("peopletag/:tag", action("peopletag"), params([("tag", TAG_PATTERN)]))?;

    // Groups
    t.connect("group/new", action("newgroup"), none())?;
    t.connect("group/search", action("groupsearch"), none())?;
    t.connect("group/:id/id", action("groupbyid"), id("id"))?;
    for (page, name) in GROUP_PAGES {
        t.connect(&format!("group/:nickname/{}", page), action(name), nickname())?;
    }
    t.connect("group/:nickname", action("showgroup"), nickname())?;
    t.connect("group", action("groups"), none())?;
    t.connect("groups", action("groups"), none())?;

    // Site-wide streams
    t.connect("featured", action("featured"), none())?;
    t.connect("favorited", action("favorited"), none())?;
    t.connect("favoritedrss", action("favoritedrss"), none())?;

    // API
    let format = || params([("format", API_FORMAT_PATTERN)]);
    t.connect("api/statuses/public_timeline.:format", action("ApiTimelinePublic"), format())?;
    t.connect(
        "api/statuses/show/:id.:format",
        action("ApiStatusesShow"),
        params([("id", ID_PATTERN), ("format", API_FORMAT_PATTERN)]),
    )?;
    t.connect(
        "api/statuses/user_timeline/:id.:format",
        action("ApiTimelineUser"),
        params([("id", "[a-zA-Z0-9]+"), ("format", API_FORMAT_PATTERN)]),
    )?;
    t.connect(
        "api/statusnet/version.:format",
        action("ApiGNUsocialVersion"),
        params([("format", "(xml|json)")]),
    )?;

    if site.single_user {
        connect_single_user_routes(t, &site.single_user_nickname)
    } else {
        connect_multi_user_routes(t)
    }
}

/// Single-user sites serve their one user at the root.
fn connect_single_user_routes(t: &mut RouteTable, nickname: &str) -> Result<(), DeclarationError> {
    t.connect("", with_nickname("showstream", nickname), Patterns::new())?;
    t.connect("main/public", action("public"), Patterns::new())?;

    for (suffix, name) in USER_PAGES {
        t.connect(suffix, with_nickname(name, nickname), Patterns::new())?;
    }

    // Replaces the public tag page.
    t.connect(
        "tag/:tag",
        with_nickname("showstream", nickname),
        params([("tag", TAG_PATTERN)]),
    )
}

/// Multi-user sites put user pages under the nickname; these go last since
/// `:nickname` would swallow any single-segment path.
fn connect_multi_user_routes(t: &mut RouteTable) -> Result<(), DeclarationError> {
    t.connect("", action("public"), Patterns::new())?;
    t.connect("rss", action("publicrss"), Patterns::new())?;

    let nickname = || params([("nickname", NICKNAME_PATTERN)]);
    for (suffix, name) in USER_PAGES {
        t.connect(&format!(":nickname/{}", suffix), action(name), nickname())?;
    }
    t.connect(
        ":nickname/tag/:tag",
        action("showstream"),
        params([("nickname", NICKNAME_PATTERN), ("tag", TAG_PATTERN)]),
    )?;
    t.connect(":nickname", action("showstream"), nickname())
}
