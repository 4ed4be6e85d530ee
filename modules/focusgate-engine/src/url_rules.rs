//! URL rules: whole-page and whole-site blocks that bypass identity state.

use url::Url;

use focusgate_common::{BlockHomepages, SourceKind, UrlRules};

const VIDEO_HOMEPAGE: &str = "https://www.youtube.com";
const FORUM_HOMEPAGE: &str = "https://www.reddit.com";

/// Which rule a URL tripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlRuleMatch {
    Exact(String),
    Prefix(String),
    Homepage(SourceKind),
}

impl UrlRuleMatch {
    pub fn reason(&self) -> String {
        match self {
            UrlRuleMatch::Exact(rule) => format!("URL is on your exact blocklist ({rule})."),
            UrlRuleMatch::Prefix(rule) => format!("URL matches blocked pattern '{rule}'."),
            UrlRuleMatch::Homepage(kind) => format!("The {kind} homepage is blocked."),
        }
    }
}

/// Check the exact list, then the prefix list, in configured order.
pub fn match_rules(rules: &UrlRules, url: &str) -> Option<UrlRuleMatch> {
    if url.is_empty() {
        return None;
    }

    if let Some(rule) = rules.exact.iter().find(|r| r.trim() == url) {
        return Some(UrlRuleMatch::Exact(rule.trim().to_string()));
    }

    rules
        .prefix
        .iter()
        .find(|r| matches_prefix_rule(url, r))
        .map(|r| UrlRuleMatch::Prefix(r.trim().to_string()))
}

/// Homepage blocking applies only to the bare homepage URL.
pub fn match_homepage(homepages: &BlockHomepages, url: &str) -> Option<UrlRuleMatch> {
    let bare = url.strip_suffix('/').unwrap_or(url);
    if homepages.video_site && bare == VIDEO_HOMEPAGE {
        return Some(UrlRuleMatch::Homepage(SourceKind::VideoSite));
    }
    if homepages.forum_site && bare == FORUM_HOMEPAGE {
        return Some(UrlRuleMatch::Homepage(SourceKind::ForumSite));
    }
    None
}

/// A rule is either a full `http(s)://` prefix, matched as a raw string
/// prefix, or `host[/path-prefix]`, matched on hostname (equal or
/// subdomain) and path prefix.
pub fn matches_prefix_rule(url: &str, rule: &str) -> bool {
    let rule = rule.trim();
    if url.is_empty() || rule.is_empty() {
        return false;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.starts_with(rule),
    };

    let lower = rule.to_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return url.starts_with(rule);
    }

    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    match lower.find('/') {
        None => host_matches(&host, &lower),
        Some(slash) => {
            let (host_part, path_part) = lower.split_at(slash);
            host_matches(&host, host_part) && parsed.path().starts_with(path_part)
        }
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    host == pattern
        || host
            .strip_suffix(pattern)
            .is_some_and(|rest| rest.ends_with('.'))
}
