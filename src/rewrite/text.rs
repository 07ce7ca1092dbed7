//! Text marking.
//!
//! Appends [`MARKER_GLYPH`] after every six-letter word in prose text.
//! Matching runs on decoded code points; text whose immediate parent is in
//! the [`ExclusionSet`] is never touched.

use std::borrow::Cow;
use std::cell::RefCell;
use std::sync::LazyLock;

use html5ever::tendril::StrTendril;
use html5ever::QualName;
use regex::Regex;

use crate::rewrite::document::{Document, Visitor};

/// Glyph appended after each marked word (U+2122).
pub const MARKER_GLYPH: char = '\u{2122}';

/// Exactly six Unicode letters between word boundaries; digits, underscores
/// and connector punctuation break the run.
static SIX_LETTER_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{L}{6}\b").expect("six-letter word pattern compiles"));

/// Tag names whose direct text content is not prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExclusionSet(&'static [&'static str]);

impl ExclusionSet {
    pub const DEFAULT: ExclusionSet = ExclusionSet(&["script", "style", "code"]);

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(&tag)
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Mark every six-letter word in `text`.
///
/// Borrows the input when nothing matched.
pub fn mark_words(text: &str) -> Cow<'_, str> {
    SIX_LETTER_WORD.replace_all(text, |caps: &regex::Captures<'_>| {
        format!("{}{}", &caps[0], MARKER_GLYPH)
    })
}

struct MarkVisitor {
    exclude: ExclusionSet,
    marked: usize,
}

impl Visitor for MarkVisitor {
    fn text(&mut self, parent: Option<&QualName>, contents: &RefCell<StrTendril>) {
        if parent.is_some_and(|p| self.exclude.contains(&p.local)) {
            return;
        }

        let replaced = match mark_words(&contents.borrow()) {
            Cow::Borrowed(_) => return,
            Cow::Owned(replaced) => replaced,
        };
        self.marked += replaced.matches(MARKER_GLYPH).count()
            - contents.borrow().matches(MARKER_GLYPH).count();
        *contents.borrow_mut() = StrTendril::from(replaced);
    }
}

/// Mark six-letter words in every eligible text node of `document`.
///
/// Returns the number of words marked.
pub fn mark_text(document: &Document, exclude: ExclusionSet) -> usize {
    let mut visitor = MarkVisitor { exclude, marked: 0 };
    document.walk(&mut visitor);
    visitor.marked
}
