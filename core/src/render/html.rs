//! HTML serialization of rendered messages.
//!
//! Every piece of text is escaped; the only markup in the output is the markup
//! written here.

use chrono::SecondsFormat;
use std::fmt::Write;

use super::{render_message, Alignment, Block, Inline, Link, Rendered, Table};
use crate::session::{Author, Message};

const STYLE: &str = "\
body{font-family:system-ui,sans-serif;max-width:56rem;margin:2rem auto;padding:0 1.5rem;background:#f8fafc;color:#1e293b}\
.message{margin:0 0 1.5rem;padding:.9rem 1.25rem;border-radius:1rem;max-width:75%}\
.message.user{margin-left:auto;background:#4f46e5;color:#fff}\
.message.user p{white-space:pre-wrap;overflow-wrap:break-word;margin:0}\
.message.assistant{background:#fff;border:1px solid #e2e8f0}\
.table-scroll{overflow-x:auto;margin:.75rem 0}\
table{border-collapse:collapse;min-width:100%}\
th,td{border:1px solid #e2e8f0;padding:.5rem 1rem;text-align:left}\
thead{background:#f1f5f9}th{font-weight:600}\
pre{background:#f1f5f9;padding:1rem;border-radius:.5rem;overflow-x:auto}\
blockquote{border-left:4px solid #a5b4fc;padding-left:1rem;font-style:italic}\
time{display:block;margin-top:.4rem;font-size:.75rem;opacity:.7}";

/// A standalone HTML page holding the whole transcript.
pub fn render_transcript(title: &str, transcript: &[Message]) -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(title));
    let _ = writeln!(out, "<style>{}</style>", STYLE);
    out.push_str("</head>\n<body>\n");
    let _ = writeln!(out, "<h1>{}</h1>", escape(title));
    for message in transcript {
        out.push_str(&message_to_html(message));
    }
    out.push_str("</body>\n</html>\n");
    out
}

/// One transcript entry as an HTML fragment.
pub fn message_to_html(message: &Message) -> String {
    let class = match message.author() {
        Author::User => "user",
        Author::Assistant => "assistant",
    };
    let mut out = String::new();
    let _ = write!(
        out,
        "<div class=\"message {}\" id=\"m-{}\">",
        class,
        message.id()
    );
    out.push_str(&rendered_to_html(&render_message(message)));
    let created = message.created_at();
    let _ = write!(
        out,
        "<time datetime=\"{}\">{}</time>",
        created.to_rfc3339_opts(SecondsFormat::Secs, true),
        created.format("%H:%M")
    );
    out.push_str("</div>\n");
    out
}

pub fn rendered_to_html(rendered: &Rendered) -> String {
    let mut out = String::new();
    match rendered {
        Rendered::Plain(text) => {
            out.push_str("<p>");
            out.push_str(&escape(text));
            out.push_str("</p>");
        }
        Rendered::Markdown(blocks) => write_blocks(&mut out, blocks),
    }
    out
}

fn write_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        write_block(out, block);
    }
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            write_inlines(out, inlines);
            out.push_str("</p>");
        }
        Block::Heading { level, content } => {
            let _ = write!(out, "<h{}>", level);
            write_inlines(out, content);
            let _ = write!(out, "</h{}>", level);
        }
        Block::List { start, items } => {
            match start {
                Some(1) => out.push_str("<ol>"),
                Some(n) => {
                    let _ = write!(out, "<ol start=\"{}\">", n);
                }
                None => out.push_str("<ul>"),
            }
            for item in items {
                out.push_str("<li>");
                if let Some(checked) = item.checked {
                    out.push_str(if checked {
                        "<input type=\"checkbox\" checked disabled> "
                    } else {
                        "<input type=\"checkbox\" disabled> "
                    });
                }
                write_blocks(out, &item.blocks);
                out.push_str("</li>");
            }
            out.push_str(if start.is_some() { "</ol>" } else { "</ul>" });
        }
        Block::CodeBlock { language, code } => {
            match language {
                Some(lang) => {
                    let _ = write!(out, "<pre><code class=\"language-{}\">", escape(lang));
                }
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape(code));
            out.push_str("</code></pre>");
        }
        Block::BlockQuote(blocks) => {
            out.push_str("<blockquote>");
            write_blocks(out, blocks);
            out.push_str("</blockquote>");
        }
        Block::Rule => out.push_str("<hr>"),
        Block::ScrollContainer(table) => {
            out.push_str("<div class=\"table-scroll\">");
            write_table(out, table);
            out.push_str("</div>");
        }
    }
}

fn write_table(out: &mut String, table: &Table) {
    let align = |i: usize| match table.alignments.get(i) {
        Some(Alignment::Left) => " style=\"text-align:left\"",
        Some(Alignment::Center) => " style=\"text-align:center\"",
        Some(Alignment::Right) => " style=\"text-align:right\"",
        _ => "",
    };

    out.push_str("<table><thead><tr>");
    for (i, cell) in table.header.iter().enumerate() {
        let _ = write!(out, "<th{}>", align(i));
        write_inlines(out, cell);
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in &table.rows {
        out.push_str("<tr>");
        for (i, cell) in row.iter().enumerate() {
            let _ = write!(out, "<td{}>", align(i));
            write_inlines(out, cell);
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(&escape(text)),
            Inline::Code(code) => {
                out.push_str("<code>");
                out.push_str(&escape(code));
                out.push_str("</code>");
            }
            Inline::Emphasis(children) => wrap(out, "em", children),
            Inline::Strong(children) => wrap(out, "strong", children),
            Inline::Strikethrough(children) => wrap(out, "del", children),
            Inline::Link(link) => write_link(out, link),
            Inline::SoftBreak => out.push('\n'),
            Inline::HardBreak => out.push_str("<br>"),
        }
    }
}

fn wrap(out: &mut String, tag: &str, children: &[Inline]) {
    let _ = write!(out, "<{}>", tag);
    write_inlines(out, children);
    let _ = write!(out, "</{}>", tag);
}

fn write_link(out: &mut String, link: &Link) {
    let _ = write!(out, "<a href=\"{}\"", escape(&link.href));
    if let Some(title) = &link.title {
        let _ = write!(out, " title=\"{}\"", escape(title));
    }
    if link.policy.new_context {
        out.push_str(" target=\"_blank\"");
    }
    let rel = link.policy.rel();
    if !rel.is_empty() {
        let _ = write!(out, " rel=\"{}\"", rel);
    }
    out.push('>');
    write_inlines(out, &link.children);
    out.push_str("</a>");
}

/// Escapes text for use in HTML content and double- or single-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
