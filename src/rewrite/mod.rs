//! Response rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamResponse
//!     → pipeline.rs (content-type gate, decode)
//!     → document.rs (html5ever tree, single visitor walk)
//!     → links.rs (a@href, use@xlink:href, form@action → proxy authority)
//!     → text.rs (six-letter words get a ™, script/style/code excluded)
//!     → pipeline.rs (serialize, new UpstreamResponse)
//! ```
//!
//! # Design Decisions
//! - Links are rewritten before text is marked, on the same tree
//! - Only text node contents and three attributes are ever mutated;
//!   element structure is never changed
//! - Each request owns its tree; nothing is shared between requests

pub mod document;
pub mod links;
pub mod pipeline;
pub mod text;

pub use document::{Document, Visitor};
pub use links::{rewrite_links, LinkSite, LinkTarget, LINK_SITES};
pub use pipeline::{is_html, Pipeline, PipelineError, RewrittenBody};
pub use text::{mark_text, mark_words, ExclusionSet, MARKER_GLYPH};
