use colored::*;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};
use trip_agent_core::render::{plain_text, Alignment, Block, Inline, Link, ListItem, Table};
use trip_agent_core::{render_message, Author, HealthResponse, Message, Rendered};

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// Renders transcript entries for an ANSI terminal.
pub struct TerminalRenderer {
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
}

impl TerminalRenderer {
    pub fn new(theme_name: Option<&str>) -> Self {
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_name
            .and_then(|name| theme_set.themes.remove(name))
            .or_else(|| theme_set.themes.remove(DEFAULT_THEME));
        Self { syntax_set, theme }
    }

    /// Prints one transcript entry with an author prefix.
    pub fn print_message(&self, message: &Message) {
        let label = match message.author() {
            Author::User => "You".green().bold(),
            Author::Assistant => "Assistant".blue().bold(),
        };
        let body = self.render(&render_message(message));
        println!("{}: {}", label, body.trim_end());
    }

    pub fn render(&self, rendered: &Rendered) -> String {
        match rendered {
            Rendered::Plain(text) => sanitize(text),
            Rendered::Markdown(blocks) => self.blocks(blocks),
        }
    }

    fn blocks(&self, blocks: &[Block]) -> String {
        let parts: Vec<String> = blocks.iter().map(|b| self.block(b)).collect();
        parts.join("\n\n")
    }

    fn block(&self, block: &Block) -> String {
        match block {
            Block::Paragraph(inlines) => self.inlines(inlines),
            Block::Heading { level, content } => {
                let text = self.inlines(content);
                match level {
                    1 => text.bright_cyan().bold().underline().to_string(),
                    2 => text.bright_cyan().bold().to_string(),
                    3 => text.cyan().bold().to_string(),
                    _ => text.bold().to_string(),
                }
            }
            Block::List { start, items } => self.list(*start, items),
            Block::CodeBlock { language, code } => self.code_block(language.as_deref(), code),
            Block::BlockQuote(blocks) => prefix_lines(
                &self.blocks(blocks),
                &format!("{} ", "│".dimmed()),
                &format!("{} ", "│".dimmed()),
            ),
            Block::Rule => "─".repeat(40).dimmed().to_string(),
            Block::ScrollContainer(table) => self.table(table),
        }
    }

    fn list(&self, start: Option<u64>, items: &[ListItem]) -> String {
        let mut lines = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let marker = match start {
                Some(n) => format!("{}.", n + i as u64).yellow().to_string(),
                None => "•".yellow().to_string(),
            };
            let marker = match item.checked {
                Some(true) => format!("{} [x]", marker),
                Some(false) => format!("{} [ ]", marker),
                None => marker,
            };
            // Items are rendered tight regardless of the source spacing.
            let parts: Vec<String> = item.blocks.iter().map(|b| self.block(b)).collect();
            lines.push(prefix_lines(
                &parts.join("\n"),
                &format!("{}  ", marker),
                "   ",
            ));
        }
        lines.join("\n")
    }

    fn code_block(&self, language: Option<&str>, code: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("{}:\n", sanitize(language.unwrap_or("code")).cyan()));
        output.push_str(&"─".repeat(40).dimmed().to_string());
        output.push('\n');

        let code = sanitize(code);
        match (&self.theme, colored::control::SHOULD_COLORIZE.should_colorize()) {
            (Some(theme), true) => {
                let syntax = language
                    .and_then(|lang| self.syntax_set.find_syntax_by_token(lang))
                    .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
                let mut highlighter = HighlightLines::new(syntax, theme);
                for line in LinesWithEndings::from(&code) {
                    let highlighted = highlighter
                        .highlight_line(line, &self.syntax_set)
                        .unwrap_or_default();
                    output.push_str(&as_24_bit_terminal_escaped(&highlighted, false));
                }
                output.push_str("\x1b[0m");
            }
            _ => output.push_str(&code),
        }

        if !output.ends_with('\n') {
            output.push('\n');
        }
        output.push_str(&"─".repeat(40).dimmed().to_string());
        output
    }

    fn table(&self, table: &Table) -> String {
        let col_count = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.header.len()))
            .max()
            .unwrap_or(0);
        let mut col_widths = vec![0; col_count];
        for row in std::iter::once(&table.header).chain(table.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                col_widths[i] = col_widths[i].max(display_width(cell));
            }
        }

        let mut output = String::new();
        let render_row = |output: &mut String, row: &[Vec<Inline>], header: bool| {
            for (j, width) in col_widths.iter().enumerate() {
                let (text, used) = match row.get(j) {
                    Some(cell) => (self.inlines(cell), display_width(cell)),
                    None => (String::new(), 0),
                };
                let padding = width.saturating_sub(used);
                let (left, right) = match table.alignments.get(j) {
                    Some(Alignment::Right) => (padding, 0),
                    Some(Alignment::Center) => (padding / 2, padding - padding / 2),
                    _ => (0, padding),
                };
                let text = if header { text.bold().to_string() } else { text };
                output.push_str(&" ".repeat(left));
                output.push_str(&text);
                output.push_str(&" ".repeat(right));
                if j + 1 < col_widths.len() {
                    output.push_str("  ");
                }
            }
            output.push('\n');
        };

        render_row(&mut output, &table.header, true);
        let separator: Vec<String> = col_widths
            .iter()
            .map(|w| "─".repeat(*w).dimmed().to_string())
            .collect();
        output.push_str(&separator.join("  "));
        output.push('\n');
        for row in &table.rows {
            render_row(&mut output, row, false);
        }
        output.trim_end_matches('\n').to_string()
    }

    fn inlines(&self, inlines: &[Inline]) -> String {
        let mut output = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(text) => output.push_str(&sanitize(text)),
                Inline::Code(code) => {
                    output.push_str(&format!("`{}`", sanitize(code).on_bright_black().white()))
                }
                Inline::Emphasis(children) => {
                    output.push_str(&self.inlines(children).italic().to_string())
                }
                Inline::Strong(children) => {
                    output.push_str(&self.inlines(children).bold().to_string())
                }
                Inline::Strikethrough(children) => {
                    output.push_str(&self.inlines(children).strikethrough().to_string())
                }
                Inline::Link(link) => output.push_str(&self.link(link)),
                Inline::SoftBreak => output.push(' '),
                Inline::HardBreak => output.push('\n'),
            }
        }
        output
    }

    fn link(&self, link: &Link) -> String {
        let label = plain_text(&link.children);
        let href = sanitize(&link.href);
        if label == link.href {
            href.blue().underline().to_string()
        } else {
            format!(
                "{} ({})",
                self.inlines(&link.children).blue().underline(),
                href.dimmed()
            )
        }
    }
}

/// Makes control characters visible instead of letting the terminal act on
/// them. Newlines and tabs are kept; a `\r` before `\n` is dropped.
pub fn sanitize(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\n' | '\t' => output.push(c),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\x7f' => output.push_str("^?"),
            c if (c as u32) < 0x20 => {
                output.push('^');
                output.push(char::from(c as u8 + 0x40));
            }
            c if c.is_control() => output.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => output.push(c),
        }
    }
    output
}

fn display_width(cell: &[Inline]) -> usize {
    sanitize(&plain_text(cell)).chars().count()
}

fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    let mut output = String::new();
    for (i, line) in text.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }
        output.push_str(if i == 0 { first } else { rest });
        output.push_str(line);
    }
    if output.is_empty() {
        output.push_str(first);
    }
    output
}

pub fn print_health(health: &HealthResponse) {
    println!(
        "{} {} (version {})",
        "Status:".cyan().bold(),
        sanitize(&health.status).green(),
        if health.version.is_empty() {
            "unknown".to_string()
        } else {
            sanitize(&health.version)
        }
    );
    if !health.message.is_empty() {
        println!("{}", sanitize(&health.message));
    }
}
