//! HTML link rewriting.
//!
//! Rewrites every `href`, `src`, and `action` attribute so the linked
//! resource is fetched back through the relay, and injects a `<base>` tag
//! pointing at the real origin for anything the patterns miss.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use url::Url;

use crate::upstream::target::{normalize_target, origin_of};

use super::wrap_proxy_url;

static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\b(?P<attr>href|src|action)(?P<eq>\s*=\s*)(?:"(?P<dq>[^"]*)"|'(?P<sq>[^']*)')"#)
        .expect("valid attribute regex")
});
static HEAD_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<head[^>]*>").expect("valid head regex"));
static BASE_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<base\b").expect("valid base regex"));

/// Schemes and pseudo-links that must never be routed through the relay.
const UNPROXIED_PREFIXES: &[&str] = &["javascript:", "mailto:", "data:", "about:", "tel:", "blob:"];

/// Rewrite attribute links in `input` against `target`, then ensure a
/// `<base>` tag exists so relative references the patterns missed still
/// resolve at the real origin.
///
/// Injection happens after the attribute pass on purpose: the base tag has
/// to carry the raw origin, not a wrapped URL.
pub fn rewrite_html(input: &str, target: &Url) -> String {
    let rewritten = ATTR_RE
        .replace_all(input, |caps: &Captures| {
            let attr = &caps["attr"];
            let eq = &caps["eq"];
            let (quote, raw) = match caps.name("dq") {
                Some(m) => ('"', m.as_str()),
                None => ('\'', caps.name("sq").map(|m| m.as_str()).unwrap_or("")),
            };
            match rewrite_link(raw, target) {
                Some(wrapped) => format!("{attr}{eq}{quote}{wrapped}{quote}"),
                // fail open: leave the one link untouched
                None => caps[0].to_string(),
            }
        })
        .into_owned();

    inject_base(&rewritten, target)
}

/// Resolve one attribute value and wrap it, or `None` to leave it alone.
fn rewrite_link(raw: &str, target: &Url) -> Option<String> {
    let link = raw.trim();
    if link.is_empty() || link.starts_with('#') || link.starts_with("/proxy?url=") {
        return None;
    }
    let lowered = link.to_ascii_lowercase();
    if UNPROXIED_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
        return None;
    }
    let absolute = normalize_target(link, Some(target.as_str())).ok()?;
    Some(wrap_proxy_url(&absolute))
}

/// Insert `<base href="{origin}/">` right after `<head>` unless the page
/// already declares a base. Pages without a `<head>` are left as-is.
fn inject_base(input: &str, target: &Url) -> String {
    if BASE_TAG_RE.is_match(input) {
        return input.to_string();
    }
    match HEAD_OPEN_RE.find(input) {
        Some(head) => {
            let tag = format!("<base href=\"{}/\">", origin_of(target));
            let mut out = String::with_capacity(input.len() + tag.len());
            out.push_str(&input[..head.end()]);
            out.push_str(&tag);
            out.push_str(&input[head.end()..]);
            out
        }
        None => input.to_string(),
    }
}
