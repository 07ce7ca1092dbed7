//! Link rewriting.
//!
//! Points every link that syntactically names the upstream origin back at
//! the proxy. Only three (tag, attribute) sites are inspected and only URLs
//! carrying an authority are candidates; relative links, fragments,
//! `mailto:` and third-party hosts are left byte-identical.

use std::cell::RefCell;

use html5ever::tendril::StrTendril;
use html5ever::{Attribute, QualName};
use url::Url;

use crate::rewrite::document::{Document, Visitor};

/// A (tag, attribute) pair where a rewritable URL may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSite {
    pub tag: &'static str,
    pub attribute: &'static str,
}

/// The closed set of link sites.
pub const LINK_SITES: [LinkSite; 3] = [
    LinkSite { tag: "a", attribute: "href" },
    LinkSite { tag: "use", attribute: "xlink:href" },
    LinkSite { tag: "form", attribute: "action" },
];

/// Where upstream links are redirected to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    /// Scheme written into rewritten links ("http").
    pub scheme: String,
    /// The proxy's own host:port.
    pub authority: String,
    /// Substring identifying the upstream origin in an authority.
    pub origin_marker: String,
}

impl LinkTarget {
    pub fn new(
        scheme: impl Into<String>,
        authority: impl Into<String>,
        origin_marker: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            authority: authority.into(),
            origin_marker: origin_marker.into().to_ascii_lowercase(),
        }
    }

    /// Rewrite a single URL value.
    ///
    /// Returns `None` when the value must stay untouched: no authority,
    /// malformed, or an authority without the origin marker. Path, query and
    /// fragment are copied verbatim from the input.
    pub fn rewrite_url(&self, value: &str) -> Option<String> {
        let value = value.trim();
        let (authority, rest) = split_authority(value)?;

        // Malformed values fall through to the no-match case.
        let absolute = if value.starts_with("//") {
            format!("http:{value}")
        } else {
            value.to_string()
        };
        if !Url::parse(&absolute).ok()?.has_host() {
            return None;
        }

        if !authority.to_ascii_lowercase().contains(&self.origin_marker) {
            return None;
        }

        Some(format!("{}://{}{}", self.scheme, self.authority, rest))
    }
}

/// Split `scheme://authority/rest` (or `//authority/rest`) into the raw
/// authority and everything after it.
fn split_authority(value: &str) -> Option<(&str, &str)> {
    let after_scheme = match value.strip_prefix("//") {
        Some(rest) => rest,
        None => {
            let (scheme, rest) = value.split_once(':')?;
            if !is_scheme(scheme) {
                return None;
            }
            rest.strip_prefix("//")?
        }
    };

    let end = after_scheme
        .find(|c| matches!(c, '/' | '?' | '#'))
        .unwrap_or(after_scheme.len());
    Some(after_scheme.split_at(end))
}

fn is_scheme(candidate: &str) -> bool {
    let mut chars = candidate.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// `prefix:local` for namespaced attributes such as SVG's `xlink:href`.
fn qualified_name(name: &QualName) -> String {
    match &name.prefix {
        Some(prefix) => format!("{}:{}", prefix, name.local),
        None => name.local.to_string(),
    }
}

struct LinkVisitor<'a> {
    target: &'a LinkTarget,
    rewritten: usize,
}

impl Visitor for LinkVisitor<'_> {
    fn element(&mut self, name: &QualName, attrs: &RefCell<Vec<Attribute>>) {
        for site in LINK_SITES.iter().filter(|site| &*name.local == site.tag) {
            for attr in attrs.borrow_mut().iter_mut() {
                if attr.value.is_empty() || qualified_name(&attr.name) != site.attribute {
                    continue;
                }
                if let Some(rewritten) = self.target.rewrite_url(&attr.value) {
                    attr.value = StrTendril::from(rewritten);
                    self.rewritten += 1;
                }
            }
        }
    }
}

/// Rewrite every upstream link in `document` in place.
///
/// Returns the number of attributes changed.
pub fn rewrite_links(document: &Document, target: &LinkTarget) -> usize {
    let mut visitor = LinkVisitor {
        target,
        rewritten: 0,
    };
    document.walk(&mut visitor);
    visitor.rewritten
}
