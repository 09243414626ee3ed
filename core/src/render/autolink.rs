// Bare-URL detection for text runs (GFM "extended autolinks").

use super::{Inline, Link};

const PREFIXES: [&str; 3] = ["https://", "http://", "www."];

/// Splits text runs at bare URLs, turning each URL into a link.
pub(super) fn linkify(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(text) => split_text(&text, &mut out),
            other => out.push(other),
        }
    }
    out
}

fn split_text(text: &str, out: &mut Vec<Inline>) {
    let mut rest = text;
    while let Some((start, end)) = find_url(rest) {
        let url = &rest[start..end];
        let href = if url.starts_with("www.") {
            format!("http://{}", url)
        } else {
            url.to_string()
        };
        match Link::isolated(&href, None, vec![Inline::Text(url.to_string())]) {
            Some(link) => {
                push_text(out, &rest[..start]);
                out.push(Inline::Link(link));
            }
            None => push_text(out, &rest[..end]),
        }
        rest = &rest[end..];
    }
    push_text(out, rest);
}

fn push_text(out: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        last.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

/// Byte range of the first URL in `text`.
fn find_url(text: &str) -> Option<(usize, usize)> {
    let lower = text.to_ascii_lowercase();
    let mut search_from = 0;
    loop {
        let (start, prefix) = PREFIXES
            .iter()
            .filter_map(|p| lower[search_from..].find(p).map(|i| (search_from + i, *p)))
            .min_by_key(|(i, _)| *i)?;

        let boundary_ok = text[..start]
            .chars()
            .next_back()
            .is_none_or(|c| c.is_whitespace() || matches!(c, '(' | '*' | '_' | '~' | '"' | '\''));

        let end = start
            + text[start..]
                .find(|c: char| c.is_whitespace() || c == '<')
                .unwrap_or(text.len() - start);
        let end = trim_trailing(text, start, end);

        if boundary_ok && end > start + prefix.len() && has_host(&text[start + prefix.len()..end]) {
            return Some((start, end));
        }
        search_from = start + prefix.len();
    }
}

fn has_host(after_prefix: &str) -> bool {
    let host = after_prefix.split(['/', '?', '#']).next().unwrap_or("");
    !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
}

/// Drops trailing punctuation and any `)` without a matching `(`.
fn trim_trailing(text: &str, start: usize, mut end: usize) -> usize {
    loop {
        let candidate = &text[start..end];
        let Some(last) = candidate.chars().next_back() else {
            return end;
        };
        let drop = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '"' | '\'' | '*' | '_' | '~' => true,
            ')' => candidate.matches(')').count() > candidate.matches('(').count(),
            _ => false,
        };
        if !drop {
            return end;
        }
        end -= last.len_utf8();
    }
}
