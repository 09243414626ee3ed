use pulldown_cmark::{
    Alignment as MdAlignment, CodeBlockKind, Event as MdEvent, HeadingLevel, Options,
    Parser as MdParser, Tag,
};

use super::autolink::linkify;
use super::{is_safe_href, Alignment, Block, Cell, Inline, Link, ListItem, Table};

/// Parse assistant markdown into block nodes.
///
/// Tables, strikethrough and task lists are enabled. Raw HTML is kept as
/// literal text, and headings deeper than four levels are clamped to level 4.
pub fn parse_markdown(markdown: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut builder = TreeBuilder::new();
    for event in MdParser::new_ext(markdown, options) {
        builder.event(event);
    }
    builder.finish()
}

enum InlineKind {
    Paragraph,
    Heading(u8),
    Cell,
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: Option<String> },
    Image { src: String, title: Option<String> },
}

enum BlockKind {
    Root,
    Quote,
    Item,
}

enum Frame {
    Blocks {
        kind: BlockKind,
        blocks: Vec<Block>,
        // Inline content of tight list items, which has no paragraph wrapper.
        loose: Vec<Inline>,
        checked: Option<bool>,
    },
    Inlines {
        kind: InlineKind,
        children: Vec<Inline>,
    },
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    Table {
        alignments: Vec<Alignment>,
        header: Vec<Cell>,
        rows: Vec<Vec<Cell>>,
        row: Vec<Cell>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
}

impl Frame {
    fn blocks(kind: BlockKind) -> Self {
        Frame::Blocks {
            kind,
            blocks: Vec::new(),
            loose: Vec::new(),
            checked: None,
        }
    }

    fn inlines(kind: InlineKind) -> Self {
        Frame::Inlines {
            kind,
            children: Vec::new(),
        }
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::blocks(BlockKind::Root)],
        }
    }

    fn event(&mut self, event: MdEvent<'_>) {
        match event {
            MdEvent::Start(tag) => self.start(tag),
            MdEvent::End(tag) => self.end(tag),
            MdEvent::Text(text) => self.text(&text),
            MdEvent::Code(code) => self.push_inline(Inline::Code(code.to_string())),
            MdEvent::Html(html) => self.text(&html),
            MdEvent::SoftBreak => self.push_inline(Inline::SoftBreak),
            MdEvent::HardBreak => self.push_inline(Inline::HardBreak),
            MdEvent::Rule => self.push_block(Block::Rule),
            MdEvent::TaskListMarker(done) => {
                if let Some(Frame::Blocks { checked, .. }) = self.stack.last_mut() {
                    *checked = Some(done);
                }
            }
            MdEvent::FootnoteReference(label) => self.text(&format!("[^{}]", label)),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let frame = match tag {
            Tag::Paragraph => Frame::inlines(InlineKind::Paragraph),
            Tag::Heading(level, ..) => Frame::inlines(InlineKind::Heading(heading_level(level))),
            Tag::BlockQuote => Frame::blocks(BlockKind::Quote),
            Tag::CodeBlock(kind) => Frame::Code {
                language: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                },
                code: String::new(),
            },
            Tag::List(start) => Frame::List {
                start,
                items: Vec::new(),
            },
            Tag::Item => Frame::blocks(BlockKind::Item),
            // Footnotes are not enabled; keep the content if one slips through.
            Tag::FootnoteDefinition(_) => Frame::blocks(BlockKind::Quote),
            Tag::Table(alignments) => Frame::Table {
                alignments: alignments.into_iter().map(alignment).collect(),
                header: Vec::new(),
                rows: Vec::new(),
                row: Vec::new(),
            },
            // Header cells arrive directly under TableHead without a row.
            Tag::TableHead | Tag::TableRow => return,
            Tag::TableCell => Frame::inlines(InlineKind::Cell),
            Tag::Emphasis => Frame::inlines(InlineKind::Emphasis),
            Tag::Strong => Frame::inlines(InlineKind::Strong),
            Tag::Strikethrough => Frame::inlines(InlineKind::Strikethrough),
            Tag::Link(_, href, title) => Frame::inlines(InlineKind::Link {
                href: href.to_string(),
                title: non_empty(&title),
            }),
            Tag::Image(_, src, title) => Frame::inlines(InlineKind::Image {
                src: src.to_string(),
                title: non_empty(&title),
            }),
        };
        self.stack.push(frame);
    }

    fn end(&mut self, tag: Tag<'_>) {
        if let Tag::TableHead | Tag::TableRow = tag {
            if let Some(Frame::Table { row, header, rows, .. }) = self.stack.last_mut() {
                let cells = std::mem::take(row);
                if matches!(tag, Tag::TableHead) {
                    *header = cells;
                } else {
                    rows.push(cells);
                }
            }
            return;
        }

        // The root frame is never closed by an event.
        if self.stack.len() <= 1 {
            return;
        }
        let Some(frame) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Inlines { kind, children } => self.close_inlines(kind, children),
            Frame::Blocks {
                kind,
                mut blocks,
                loose,
                checked,
            } => {
                flush_loose(&mut blocks, loose);
                match kind {
                    BlockKind::Item => {
                        if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                            items.push(ListItem { checked, blocks });
                        }
                    }
                    BlockKind::Quote | BlockKind::Root => {
                        self.push_block(Block::BlockQuote(blocks))
                    }
                }
            }
            Frame::List { start, items } => self.push_block(Block::List { start, items }),
            Frame::Table {
                alignments,
                header,
                rows,
                ..
            } => self.push_block(Block::ScrollContainer(Table {
                alignments,
                header,
                rows,
            })),
            Frame::Code { language, code } => self.push_block(Block::CodeBlock { language, code }),
        }
    }

    fn close_inlines(&mut self, kind: InlineKind, children: Vec<Inline>) {
        let is_link = matches!(kind, InlineKind::Link { .. } | InlineKind::Image { .. });
        let children = if is_link || self.inside_link() {
            children
        } else {
            linkify(children)
        };
        match kind {
            InlineKind::Paragraph => self.push_block(Block::Paragraph(children)),
            InlineKind::Heading(level) => self.push_block(Block::Heading {
                level,
                content: children,
            }),
            InlineKind::Cell => {
                if let Some(Frame::Table { row, .. }) = self.stack.last_mut() {
                    row.push(children);
                }
            }
            InlineKind::Emphasis => self.push_inline(Inline::Emphasis(children)),
            InlineKind::Strong => self.push_inline(Inline::Strong(children)),
            InlineKind::Strikethrough => self.push_inline(Inline::Strikethrough(children)),
            InlineKind::Link { href, title } => self.push_link(&href, title, children),
            InlineKind::Image { src, title } => {
                let label = if children.is_empty() {
                    vec![Inline::Text(src.clone())]
                } else {
                    children
                };
                self.push_link(&src, title, label);
            }
        }
    }

    /// Pushes a link, or only its label when the destination is unsafe.
    fn push_link(&mut self, href: &str, title: Option<String>, label: Vec<Inline>) {
        if is_safe_href(href) && !self.inside_link() {
            if let Some(link) = Link::isolated(href, title, label) {
                self.push_inline(Inline::Link(link));
            }
        } else {
            for inline in label {
                self.push_inline(inline);
            }
        }
    }

    fn inside_link(&self) -> bool {
        self.stack.iter().any(|frame| {
            matches!(
                frame,
                Frame::Inlines {
                    kind: InlineKind::Link { .. } | InlineKind::Image { .. },
                    ..
                }
            )
        })
    }

    fn text(&mut self, text: &str) {
        if let Some(Frame::Code { code, .. }) = self.stack.last_mut() {
            code.push_str(text);
            return;
        }
        self.push_inline(Inline::Text(text.to_string()));
    }

    fn push_inline(&mut self, inline: Inline) {
        match self.stack.last_mut() {
            Some(Frame::Inlines { children, .. }) => push_merged(children, inline),
            Some(Frame::Blocks { loose, .. }) => push_merged(loose, inline),
            Some(Frame::Code { code, .. }) => {
                if let Inline::Text(text) = inline {
                    code.push_str(&text);
                }
            }
            _ => {}
        }
    }

    fn push_block(&mut self, block: Block) {
        if let Some(Frame::Blocks { blocks, loose, .. }) = self.stack.last_mut() {
            flush_loose(blocks, std::mem::take(loose));
            blocks.push(block);
        }
    }

    fn finish(mut self) -> Vec<Block> {
        match self.stack.pop() {
            Some(Frame::Blocks {
                mut blocks, loose, ..
            }) => {
                flush_loose(&mut blocks, loose);
                blocks
            }
            _ => Vec::new(),
        }
    }
}

fn push_merged(target: &mut Vec<Inline>, inline: Inline) {
    if let (Some(Inline::Text(last)), Inline::Text(text)) = (target.last_mut(), &inline) {
        last.push_str(text);
        return;
    }
    target.push(inline);
}

fn flush_loose(blocks: &mut Vec<Block>, loose: Vec<Inline>) {
    if !loose.is_empty() {
        blocks.push(Block::Paragraph(linkify(loose)));
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        _ => 4,
    }
}

fn alignment(alignment: MdAlignment) -> Alignment {
    match alignment {
        MdAlignment::None => Alignment::None,
        MdAlignment::Left => Alignment::Left,
        MdAlignment::Center => Alignment::Center,
        MdAlignment::Right => Alignment::Right,
    }
}

fn non_empty(text: &str) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::LinkPolicy;

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    #[test]
    fn strong_and_inline_code() {
        let blocks = parse_markdown("**bold** and `code`");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![
                Inline::Strong(vec![text("bold")]),
                text(" and "),
                Inline::Code("code".to_string()),
            ])]
        );
    }

    #[test]
    fn fenced_block_keeps_language_and_indented_has_none() {
        let blocks = parse_markdown("```rust title\nfn main() {}\n```\n\n    plain\n");
        assert_eq!(
            blocks,
            vec![
                Block::CodeBlock {
                    language: Some("rust".to_string()),
                    code: "fn main() {}\n".to_string(),
                },
                Block::CodeBlock {
                    language: None,
                    code: "plain\n".to_string(),
                },
            ]
        );

        let untagged = parse_markdown("```\nx\n```");
        assert_eq!(
            untagged,
            vec![Block::CodeBlock {
                language: None,
                code: "x\n".to_string()
            }]
        );
    }

    #[test]
    fn headings_clamp_to_four_levels() {
        let blocks = parse_markdown("# One\n#### Four\n###### Six");
        let levels: Vec<u8> = blocks
            .iter()
            .map(|b| match b {
                Block::Heading { level, .. } => *level,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(levels, vec![1, 4, 4]);
    }

    #[test]
    fn tight_and_ordered_lists() {
        let blocks = parse_markdown("3. Venice\n4. Rome\n\n- [x] book hotel\n- [ ] pack");
        assert_eq!(blocks.len(), 2);
        match &blocks[0] {
            Block::List { start, items } => {
                assert_eq!(*start, Some(3));
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].blocks, vec![Block::Paragraph(vec![text("Venice")])]);
                assert_eq!(items[0].checked, None);
            }
            other => panic!("unexpected {:?}", other),
        }
        match &blocks[1] {
            Block::List { start, items } => {
                assert_eq!(*start, None);
                assert_eq!(items[0].checked, Some(true));
                assert_eq!(items[1].checked, Some(false));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn nested_list_inside_item() {
        let blocks = parse_markdown("- Italy\n  - Venice\n  - Rome\n- France");
        let Block::List { items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].blocks.len(), 2);
        assert!(matches!(items[0].blocks[1], Block::List { .. }));
    }

    #[test]
    fn table_is_wrapped_with_distinct_header() {
        let md = "| City | Price |\n|:-----|------:|\n| Venice | €80 |\n| Rome | €60 |";
        let blocks = parse_markdown(md);
        assert_eq!(blocks.len(), 1);
        let Block::ScrollContainer(table) = &blocks[0] else {
            panic!("expected scroll container, got {:?}", blocks[0]);
        };
        assert_eq!(table.alignments, vec![Alignment::Left, Alignment::Right]);
        assert_eq!(table.header, vec![vec![text("City")], vec![text("Price")]]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec![vec![text("Rome")], vec![text("€60")]]);
    }

    #[test]
    fn links_are_isolated() {
        let blocks = parse_markdown("[GetYourGuide](https://www.getyourguide.com \"Tours\")");
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        let Inline::Link(link) = &inlines[0] else {
            panic!("expected link");
        };
        assert_eq!(link.href, "https://www.getyourguide.com");
        assert_eq!(link.title.as_deref(), Some("Tours"));
        assert_eq!(link.children, vec![text("GetYourGuide")]);
        assert_eq!(link.policy, LinkPolicy::ISOLATED);
    }

    #[test]
    fn script_links_keep_only_their_label() {
        let blocks = parse_markdown("[click](javascript:alert(1)) now");
        assert_eq!(blocks, vec![Block::Paragraph(vec![text("click now")])]);
    }

    #[test]
    fn bare_urls_become_links_but_not_in_code() {
        let blocks = parse_markdown("Visit https://example.com/tickets or `https://raw.example`");
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(inlines[0], text("Visit "));
        assert!(matches!(&inlines[1], Inline::Link(l) if l.href == "https://example.com/tickets"));
        assert_eq!(inlines[2], text(" or "));
        assert_eq!(inlines[3], Inline::Code("https://raw.example".to_string()));
    }

    #[test]
    fn explicit_link_text_is_not_relinked() {
        let blocks = parse_markdown("[https://a.example](https://b.example)");
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(inlines.len(), 1);
        let Inline::Link(link) = &inlines[0] else {
            panic!("expected link");
        };
        assert_eq!(link.href, "https://b.example");
        assert_eq!(link.children, vec![text("https://a.example")]);
    }

    #[test]
    fn raw_html_stays_literal() {
        let blocks = parse_markdown("Hi <script>alert(1)</script> there");
        assert_eq!(
            blocks,
            vec![Block::Paragraph(vec![text("Hi <script>alert(1)</script> there")])]
        );
    }

    #[test]
    fn quotes_rules_and_emphasis() {
        let blocks = parse_markdown("> *Ciao* ~~Roma~~\n\n---\n\nend");
        assert_eq!(
            blocks,
            vec![
                Block::BlockQuote(vec![Block::Paragraph(vec![
                    Inline::Emphasis(vec![text("Ciao")]),
                    text(" "),
                    Inline::Strikethrough(vec![text("Roma")]),
                ])]),
                Block::Rule,
                Block::Paragraph(vec![text("end")]),
            ]
        );
    }

    #[test]
    fn images_become_labelled_links() {
        let blocks = parse_markdown("![Rialto bridge](https://img.example/rialto.jpg)");
        let Block::Paragraph(inlines) = &blocks[0] else {
            panic!("expected paragraph");
        };
        let Inline::Link(link) = &inlines[0] else {
            panic!("expected link");
        };
        assert_eq!(link.href, "https://img.example/rialto.jpg");
        assert_eq!(link.children, vec![text("Rialto bridge")]);
    }

    #[test]
    fn empty_input_has_no_blocks() {
        assert!(parse_markdown("").is_empty());
    }
}
