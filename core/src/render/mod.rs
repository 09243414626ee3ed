//! Conversion of transcript messages into structured, inert output nodes.
//!
//! User text is never interpreted. Assistant text is parsed as GitHub-flavored
//! markdown and mapped onto a small fixed set of node kinds; nothing found in
//! the text is ever evaluated.

mod autolink;
pub mod html;
mod markdown;

use serde::Serialize;

use crate::session::{Author, Message};

pub use markdown::parse_markdown;

/// How a message is to be displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Rendered {
    /// Literal text; whitespace and line breaks are significant.
    Plain(String),
    Markdown(Vec<Block>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Block {
    Paragraph(Vec<Inline>),
    /// `level` is always within `1..=4`.
    Heading { level: u8, content: Vec<Inline> },
    List { start: Option<u64>, items: Vec<ListItem> },
    /// A fenced block keeps its info string as `language`.
    CodeBlock { language: Option<String>, code: String },
    BlockQuote(Vec<Block>),
    Rule,
    /// Horizontally scrollable wrapper; tables are always placed in one.
    ScrollContainer(Table),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListItem {
    /// Task-list state, `None` for ordinary items.
    pub checked: Option<bool>,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

pub type Cell = Vec<Inline>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub alignments: Vec<Alignment>,
    pub header: Vec<Cell>,
    pub rows: Vec<Vec<Cell>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Inline {
    Text(String),
    /// Inline code span; carries no language tag.
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Link(Link),
    SoftBreak,
    HardBreak,
}

/// How a link is allowed to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkPolicy {
    pub new_context: bool,
    pub no_opener: bool,
    pub no_referrer: bool,
}

impl LinkPolicy {
    /// Opens in a new browsing context with no handle back to the opener.
    pub const ISOLATED: LinkPolicy = LinkPolicy {
        new_context: true,
        no_opener: true,
        no_referrer: true,
    };

    /// Value for an HTML `rel` attribute.
    pub fn rel(&self) -> String {
        let mut parts = Vec::new();
        if self.no_opener {
            parts.push("noopener");
        }
        if self.no_referrer {
            parts.push("noreferrer");
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    pub href: String,
    pub title: Option<String>,
    pub children: Vec<Inline>,
    pub policy: LinkPolicy,
}

impl Link {
    /// Builds a link if `href` is safe to follow. Only http(s), mailto and
    /// scheme-less (relative or fragment) targets are accepted.
    pub fn isolated(href: &str, title: Option<String>, children: Vec<Inline>) -> Option<Link> {
        if !is_safe_href(href) {
            return None;
        }
        Some(Link {
            href: href.to_string(),
            title,
            children,
            policy: LinkPolicy::ISOLATED,
        })
    }
}

fn is_safe_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() {
        return false;
    }
    match href.find(':') {
        None => true,
        Some(colon) => {
            let scheme = &href[..colon];
            // A ':' after a path, query or fragment separator is not a scheme.
            if scheme.contains(['/', '?', '#']) {
                return true;
            }
            matches!(
                scheme.to_ascii_lowercase().as_str(),
                "http" | "https" | "mailto"
            )
        }
    }
}

/// Maps a transcript entry onto its display form.
pub fn render_message(message: &Message) -> Rendered {
    match message.author() {
        Author::User => Rendered::Plain(message.text().to_string()),
        Author::Assistant => Rendered::Markdown(parse_markdown(message.text())),
    }
}

/// Concatenated text content of `inlines`, ignoring formatting.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    collect_text(inlines, &mut out);
    out
}

fn collect_text(inlines: &[Inline], out: &mut String) {
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children) => collect_text(children, out),
            Inline::Link(link) => collect_text(&link.children, out),
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }
}
