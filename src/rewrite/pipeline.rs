//! Document pipeline: content-type gate, decode, parse, rewrite, serialize.
//!
//! # Data Flow
//! ```text
//! UpstreamResponse
//!     → Content-Type contains text/html?  no → returned as-is
//!     → decode (BOM, charset param, <meta charset> prescan, else UTF-8)
//!     → Document::parse
//!     → rewrite_links → mark_text
//!     → to_html (UTF-8) → new UpstreamResponse
//! ```
//!
//! # Design Decisions
//! - A serialization failure falls back to the original response
//! - Bytes malformed for the chosen charset decode to U+FFFD; the page is
//!   still rewritten
//! - Output is always UTF-8, so a non-UTF-8 charset parameter is rewritten

use std::borrow::Cow;

use axum::http::header::{self, HeaderValue};
use encoding_rs::{Encoding, UTF_8};
use thiserror::Error;

use crate::rewrite::document::Document;
use crate::rewrite::links::{rewrite_links, LinkTarget};
use crate::rewrite::text::{mark_text, ExclusionSet};
use crate::upstream::UpstreamResponse;

/// Failures while rewriting an HTML body. All are recovered by serving the
/// original bytes.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to serialize document: {0}")]
    Serialize(#[from] std::io::Error),
}

/// A rewritten HTML body with what was changed.
#[derive(Debug)]
pub struct RewrittenBody {
    pub html: Vec<u8>,
    pub links_rewritten: usize,
    pub words_marked: usize,
    /// Encoding the upstream body was decoded from.
    pub source_encoding: &'static Encoding,
}

/// Per-server rewriting pipeline. Stateless between requests.
#[derive(Debug, Clone)]
pub struct Pipeline {
    target: LinkTarget,
    exclude: ExclusionSet,
}

impl Pipeline {
    pub fn new(target: LinkTarget) -> Self {
        Self {
            target,
            exclude: ExclusionSet::default(),
        }
    }

    pub fn target(&self) -> &LinkTarget {
        &self.target
    }

    /// Rewrite `response` if it is HTML; otherwise return it unchanged.
    pub fn process_response(&self, response: &UpstreamResponse) -> UpstreamResponse {
        let content_type = match response.content_type() {
            Some(ct) if is_html(ct) => ct,
            _ => return response.clone(),
        };

        match self.rewrite_html(&response.body, content_type) {
            Ok(rewritten) => {
                tracing::debug!(
                    links_rewritten = rewritten.links_rewritten,
                    words_marked = rewritten.words_marked,
                    encoding = rewritten.source_encoding.name(),
                    original_bytes = response.body.len(),
                    rewritten_bytes = rewritten.html.len(),
                    "HTML rewritten"
                );
                with_body(response, rewritten)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Serving original HTML unmodified");
                response.clone()
            }
        }
    }

    /// Decode, parse, rewrite and serialize one HTML body.
    pub fn rewrite_html(
        &self,
        body: &[u8],
        content_type: &str,
    ) -> Result<RewrittenBody, PipelineError> {
        let (text, source_encoding) = decode(body, content_type);

        let document = Document::parse(&text);
        let links_rewritten = rewrite_links(&document, &self.target);
        let words_marked = mark_text(&document, self.exclude);
        let html = document.to_html()?;

        Ok(RewrittenBody {
            html,
            links_rewritten,
            words_marked,
            source_encoding,
        })
    }
}

/// True when a Content-Type value names HTML.
pub fn is_html(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("text/html")
}

/// Value of the `charset` parameter, unquoted.
fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// How far into the body a `<meta>` charset declaration is looked for.
const META_PRESCAN_BYTES: usize = 1024;

fn decode<'a>(body: &'a [u8], content_type: &str) -> (Cow<'a, str>, &'static Encoding) {
    let (encoding, bytes) = match Encoding::for_bom(body) {
        Some((encoding, bom_len)) => (encoding, &body[bom_len..]),
        None => {
            let encoding = charset_param(content_type)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
                .or_else(|| meta_charset(body))
                .unwrap_or(UTF_8);
            (encoding, body)
        }
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        tracing::debug!(
            encoding = encoding.name(),
            "Malformed bytes replaced while decoding HTML"
        );
    }
    (text, encoding)
}

/// Charset declared by a `<meta charset>` or `<meta http-equiv>` tag near the
/// start of the body.
fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = body[..body.len().min(META_PRESCAN_BYTES)].to_ascii_lowercase();
    let mut rest = head.as_slice();

    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let tag = &tag[..tag.iter().position(|&b| b == b'>').unwrap_or(tag.len())];
        if let Some(encoding) = charset_in_tag(tag) {
            // A byte-level prescan cannot have seen UTF-16.
            return Some(encoding.output_encoding());
        }
        rest = &rest[start + 1..];
    }
    None
}

/// Encoding named by the first `charset=` inside one lower-cased tag.
fn charset_in_tag(tag: &[u8]) -> Option<&'static Encoding> {
    let mut rest = tag;
    while let Some(at) = find(rest, b"charset") {
        rest = rest[at + b"charset".len()..].trim_ascii_start();
        let Some(value) = rest.strip_prefix(b"=") else {
            continue;
        };
        let value = value.trim_ascii_start();
        let value = value
            .strip_prefix(b"\"")
            .or_else(|| value.strip_prefix(b"'"))
            .unwrap_or(value);
        let end = value
            .iter()
            .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'/' | b'>') || b.is_ascii_whitespace())
            .unwrap_or(value.len());
        return Encoding::for_label(&value[..end]);
    }
    None
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// `content_type` with its charset parameter set to utf-8.
fn utf8_content_type(content_type: &str) -> String {
    let mut parts = content_type.split(';').map(str::trim);
    let mut out = vec![parts.next().unwrap_or_default().to_string()];
    out.extend(
        parts
            .filter(|param| {
                !param
                    .split_once('=')
                    .is_some_and(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
            })
            .filter(|param| !param.is_empty())
            .map(str::to_string),
    );
    out.push("charset=utf-8".to_string());
    out.join("; ")
}

/// New response carrying the rewritten body; status and other headers are
/// copied, Content-Length is recomputed when present.
fn with_body(original: &UpstreamResponse, rewritten: RewrittenBody) -> UpstreamResponse {
    let mut headers = original.headers.clone();

    if rewritten.source_encoding != UTF_8 {
        if let Some(ct) = original.content_type() {
            if let Ok(value) = HeaderValue::from_str(&utf8_content_type(ct)) {
                headers.insert(header::CONTENT_TYPE, value);
            }
        }
    }
    if headers.contains_key(header::CONTENT_LENGTH) {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(rewritten.html.len()));
    }

    UpstreamResponse::new(original.status, headers, rewritten.html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};

    fn pipeline() -> Pipeline {
        Pipeline::new(LinkTarget::new("http", "127.0.0.1:8080", "habr"))
    }

    fn response(content_type: &str, body: &[u8]) -> UpstreamResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(body.len()));
        UpstreamResponse::new(StatusCode::OK, headers, body.to_vec())
    }

    fn body_text(response: &UpstreamResponse) -> String {
        String::from_utf8(response.body.to_vec()).unwrap()
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("Text/HTML; charset=utf-8"));
        assert!(!is_html("application/json"));
        assert!(!is_html("text/plain"));
    }

    #[test]
    fn test_charset_param() {
        assert_eq!(charset_param("text/html; charset=windows-1251"), Some("windows-1251"));
        assert_eq!(charset_param("text/html;CHARSET=\"UTF-8\""), Some("UTF-8"));
        assert_eq!(charset_param("text/html"), None);
    }

    #[test]
    fn test_utf8_content_type() {
        assert_eq!(
            utf8_content_type("text/html; charset=windows-1251"),
            "text/html; charset=utf-8"
        );
        assert_eq!(utf8_content_type("text/html"), "text/html; charset=utf-8");
    }

    #[test]
    fn test_rewrites_habr_page() {
        let input = response(
            "text/html; charset=utf-8",
            "<a href=\"https://habrahabr.ru/post/1/\">Привет мир friend</a>".as_bytes(),
        );
        let output = pipeline().process_response(&input);
        let html = body_text(&output);

        assert!(html.contains("<a href=\"http://127.0.0.1:8080/post/1/\">Привет™ мир friend™</a>"));
        assert_eq!(output.status, StatusCode::OK);
        assert_eq!(output.content_type(), Some("text/html; charset=utf-8"));
        assert_eq!(
            output.headers.get(header::CONTENT_LENGTH).unwrap(),
            &HeaderValue::from(output.body.len())
        );
        // The input is never mutated.
        assert!(body_text(&input).starts_with("<a href=\"https://habrahabr.ru"));
    }

    #[test]
    fn test_script_left_alone() {
        let output = pipeline().process_response(&response(
            "text/html",
            b"<script>var habrahabr = 1;</script>",
        ));
        assert!(body_text(&output).contains("<script>var habrahabr = 1;</script>"));
    }

    #[test]
    fn test_non_html_passthrough() {
        let body = r#"{"title": "Привет", "url": "https://habr.com/"}"#.as_bytes();
        let input = response("application/json", body);
        let output = pipeline().process_response(&input);

        assert_eq!(output.body, input.body);
        assert_eq!(output.headers, input.headers);
    }

    #[test]
    fn test_missing_content_type_passthrough() {
        let input = UpstreamResponse::new(StatusCode::OK, HeaderMap::new(), &b"<p>update</p>"[..]);
        let output = pipeline().process_response(&input);
        assert_eq!(output.body, input.body);
    }

    #[test]
    fn test_invalid_utf8_is_replaced_and_still_rewritten() {
        let input = response(
            "text/html; charset=utf-8",
            b"<a href=\"https://habr.com/post/1/\">link</a><p>caf\xe9 update</p>",
        );
        let output = pipeline().process_response(&input);
        let html = body_text(&output);

        assert!(html.contains("<a href=\"http://127.0.0.1:8080/post/1/\">link</a>"));
        assert!(html.contains("caf\u{fffd} update\u{2122}"));
        assert_eq!(output.content_type(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_meta_charset() {
        assert_eq!(
            meta_charset(b"<head><meta charset=\"windows-1251\"></head>"),
            Some(encoding_rs::WINDOWS_1251)
        );
        assert_eq!(
            meta_charset(b"<META HTTP-EQUIV=Content-Type CONTENT='text/html; charset=KOI8-R'>"),
            Some(encoding_rs::KOI8_R)
        );
        assert_eq!(meta_charset(b"<meta charset=utf-16le>"), Some(UTF_8));
        assert_eq!(meta_charset(b"<meta name=\"viewport\"><p>charset=koi8-r</p>"), None);
        assert_eq!(meta_charset(b"<meta charset=\"no-such-thing\">"), None);

        let mut late = vec![b' '; META_PRESCAN_BYTES];
        late.extend_from_slice(b"<meta charset=\"windows-1251\">");
        assert_eq!(meta_charset(&late), None);
    }

    #[test]
    fn test_meta_charset_page_is_transcoded() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251
            .encode("<html><head><meta charset=\"windows-1251\"></head><body><p>Привет</p></body></html>");
        let output = pipeline().process_response(&response("text/html", &encoded));

        assert!(body_text(&output).contains("<p>Привет™</p>"));
        assert_eq!(output.content_type(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_header_charset_beats_meta() {
        let (encoded, _, _) =
            encoding_rs::WINDOWS_1251.encode("<meta charset=\"koi8-r\"><p>Привет</p>");
        let rewritten = pipeline()
            .rewrite_html(&encoded, "text/html; charset=windows-1251")
            .unwrap();
        assert_eq!(rewritten.source_encoding, encoding_rs::WINDOWS_1251);
    }

    #[test]
    fn test_noscript_links_rewritten_and_markup_untouched() {
        let body = concat!(
            "<html><body><noscript><div><img src=\"https://mc.yandex.ru/watch/24049213\"></div>",
            "<a href=\"https://habr.com/ru/auth/\">Войти</a></noscript></body></html>"
        );
        let output = pipeline().process_response(&response("text/html", body.as_bytes()));
        let html = body_text(&output);

        assert!(html.contains("<img src=\"https://mc.yandex.ru/watch/24049213\">"));
        assert!(html.contains("<a href=\"http://127.0.0.1:8080/ru/auth/\">Войти</a>"));
        assert!(!html.contains('\u{2122}'));
    }

    #[test]
    fn test_legacy_charset_is_transcoded() {
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode("<p>Привет</p>");
        let output = pipeline().process_response(&response(
            "text/html; charset=windows-1251",
            &encoded,
        ));

        assert!(body_text(&output).contains("<p>Привет™</p>"));
        assert_eq!(output.content_type(), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_no_content_length_added() {
        let mut input = response("text/html", b"<p>x</p>");
        input.headers.remove(header::CONTENT_LENGTH);
        let output = pipeline().process_response(&input);
        assert!(!output.headers.contains_key(header::CONTENT_LENGTH));
    }

    #[test]
    fn test_rewrite_counts() {
        let rewritten = pipeline()
            .rewrite_html(
                b"<a href=\"https://habr.com/\">Habr</a><a href=\"/local\">window</a>",
                "text/html",
            )
            .unwrap();
        assert_eq!(rewritten.links_rewritten, 1);
        assert_eq!(rewritten.words_marked, 1);
        assert_eq!(rewritten.source_encoding, UTF_8);
    }
}
