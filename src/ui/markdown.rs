//! The injected rendering strategy: assistant text in, styled terminal
//! lines out.
//!
//! Rendering is a pure function of the accumulated text and the theme, so
//! the streaming loop can call it after every chunk and tests can call it
//! without a terminal. Fenced code blocks are highlighted with syntect;
//! highlighted blocks are cached because the transcript re-renders on
//! every frame while a reply is streaming.

use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock};

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use crate::ui::theme::Theme;

pub fn render_markdown(text: &str, theme: &Theme) -> Vec<Line<'static>> {
    let options =
        Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES | Options::ENABLE_TASKLISTS;
    let mut renderer = MarkdownLines::new(theme);
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

struct CodeCapture {
    lang: String,
    buffer: String,
}

struct MarkdownLines<'t> {
    theme: &'t Theme,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    list_stack: Vec<Option<u64>>,
    quote_depth: usize,
    code: Option<CodeCapture>,
}

impl<'t> MarkdownLines<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            list_stack: Vec::new(),
            quote_depth: 0,
            code: None,
        }
    }

    fn style(&self) -> Style {
        *self
            .styles
            .last()
            .unwrap_or(&self.theme.assistant_text_style)
    }

    fn push_style(&mut self, style: Style) {
        self.styles.push(style);
    }

    fn pop_style(&mut self) {
        self.styles.pop();
    }

    fn push_span(&mut self, span: Span<'static>) {
        if self.current.is_empty() && self.quote_depth > 0 {
            self.current.push(Span::styled(
                "▌ ".repeat(self.quote_depth),
                self.theme.blockquote_style,
            ));
        }
        self.current.push(span);
    }

    fn push_text(&mut self, text: &str, style: Style) {
        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                self.lines.push(Line::from(std::mem::take(&mut self.current)));
            }
            if !part.is_empty() {
                self.push_span(Span::styled(part.to_string(), style));
            }
        }
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    /// Blocks are separated by one blank line, never more.
    fn separate_block(&mut self) {
        self.flush();
        if self
            .lines
            .last()
            .is_some_and(|line| !line.spans.is_empty())
        {
            self.lines.push(Line::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        if self.code.is_some() {
            // Everything inside a fenced block is captured verbatim until
            // the closing fence.
            match event {
                Event::Text(text) => {
                    if let Some(code) = &mut self.code {
                        code.buffer.push_str(&text);
                    }
                }
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(capture) = self.code.take() {
                        let highlighted =
                            highlight_code_block(&capture.lang, &capture.buffer, self.theme);
                        self.lines.extend(highlighted);
                    }
                }
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(Tag::Paragraph) => self.separate_block(),
            Event::End(TagEnd::Paragraph) => self.flush(),

            Event::Start(Tag::Heading { .. }) => {
                self.separate_block();
                self.push_style(self.theme.heading_style);
            }
            Event::End(TagEnd::Heading(_)) => {
                self.flush();
                self.pop_style();
            }

            Event::Start(Tag::BlockQuote(_)) => {
                self.separate_block();
                self.quote_depth += 1;
                self.push_style(self.theme.blockquote_style);
            }
            Event::End(TagEnd::BlockQuote(_)) => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                self.separate_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some(CodeCapture {
                    lang,
                    buffer: String::new(),
                });
            }
            // Fenced block ends are consumed by the capture branch above;
            // this arm only fires for empty blocks.
            Event::End(TagEnd::CodeBlock) => {}

            Event::Start(Tag::List(start)) => {
                if self.list_stack.is_empty() {
                    self.separate_block();
                }
                self.list_stack.push(start);
            }
            Event::End(TagEnd::List(_)) => {
                self.list_stack.pop();
                self.flush();
            }
            Event::Start(Tag::Item) => {
                self.flush();
                let depth = self.list_stack.len().saturating_sub(1);
                let marker = match self.list_stack.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{}{}. ", "  ".repeat(depth), number);
                        *number += 1;
                        marker
                    }
                    _ => format!("{}• ", "  ".repeat(depth)),
                };
                self.push_span(Span::styled(marker, self.theme.dim_style));
            }
            Event::End(TagEnd::Item) => self.flush(),

            Event::Start(Tag::Emphasis) => {
                self.push_style(self.style().add_modifier(Modifier::ITALIC));
            }
            Event::Start(Tag::Strong) => {
                self.push_style(self.style().add_modifier(Modifier::BOLD));
            }
            Event::Start(Tag::Strikethrough) => {
                self.push_style(self.style().add_modifier(Modifier::CROSSED_OUT));
            }
            Event::End(TagEnd::Emphasis) | Event::End(TagEnd::Strong)
            | Event::End(TagEnd::Strikethrough) => self.pop_style(),

            Event::Start(Tag::Link { .. }) => self.push_style(self.theme.link_style),
            Event::End(TagEnd::Link) => self.pop_style(),
            Event::Start(Tag::Image { .. }) => self.push_style(self.theme.link_style),
            Event::End(TagEnd::Image) => self.pop_style(),

            Event::Start(Tag::Table(_)) => self.separate_block(),
            Event::End(TagEnd::Table) => self.flush(),
            Event::Start(Tag::TableHead) => {
                self.push_style(self.style().add_modifier(Modifier::BOLD));
            }
            Event::End(TagEnd::TableHead) => {
                self.flush();
                self.pop_style();
            }
            Event::End(TagEnd::TableRow) => self.flush(),
            Event::Start(Tag::TableCell) => {
                if !self.current.is_empty() {
                    self.push_span(Span::styled(" │ ", self.theme.dim_style));
                }
            }

            Event::Text(text) => self.push_text(&text, self.style()),
            Event::Code(code) => {
                let style = self.theme.inline_code_style;
                self.push_text(&code, style);
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html, self.style()),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push_span(Span::styled(marker, self.theme.dim_style));
            }
            // The original renders with line breaks enabled, so a single
            // newline in the source is a real break.
            Event::SoftBreak | Event::HardBreak => {
                self.lines.push(Line::from(std::mem::take(&mut self.current)));
            }
            Event::Rule => {
                self.separate_block();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    self.theme.dim_style,
                )));
            }
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self
            .lines
            .first()
            .is_some_and(|line| line.spans.is_empty())
        {
            self.lines.remove(0);
        }
        while self
            .lines
            .last()
            .is_some_and(|line| line.spans.is_empty())
        {
            self.lines.pop();
        }
        self.lines
    }
}

static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
static THEME_SET: OnceLock<ThemeSet> = OnceLock::new();
static HIGHLIGHT_CACHE: OnceLock<Mutex<BlockCache>> = OnceLock::new();

/// Bounded FIFO cache for highlighted blocks. The transcript redraws per
/// chunk, and syntect is by far the most expensive part of a draw.
struct BlockCache {
    map: HashMap<u64, Vec<Line<'static>>>,
    order: VecDeque<u64>,
    cap: usize,
}

impl BlockCache {
    fn new(cap: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            cap,
        }
    }

    fn get(&self, key: u64) -> Option<Vec<Line<'static>>> {
        self.map.get(&key).cloned()
    }

    fn put(&mut self, key: u64, lines: Vec<Line<'static>>) {
        if !self.map.contains_key(&key) {
            self.order.push_back(key);
        }
        self.map.insert(key, lines);
        while self.map.len() > self.cap {
            match self.order.pop_front() {
                Some(old) => {
                    self.map.remove(&old);
                }
                None => break,
            }
        }
    }
}

fn block_key(lang: &str, code: &str, theme_name: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    lang.hash(&mut hasher);
    code.hash(&mut hasher);
    theme_name.hash(&mut hasher);
    hasher.finish()
}

fn highlight_code_block(lang: &str, code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let key = block_key(lang, code, theme.syntax_theme);
    let cache = HIGHLIGHT_CACHE.get_or_init(|| Mutex::new(BlockCache::new(64)));
    if let Ok(cache) = cache.lock() {
        if let Some(lines) = cache.get(key) {
            return lines;
        }
    }

    let lines = highlight_uncached(lang, code, theme);
    if let Ok(mut cache) = cache.lock() {
        cache.put(key, lines.clone());
    }
    lines
}

fn highlight_uncached(lang: &str, code: &str, theme: &Theme) -> Vec<Line<'static>> {
    let syntaxes = SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines);
    let themes = THEME_SET.get_or_init(ThemeSet::load_defaults);

    let syntax = if lang.is_empty() {
        None
    } else {
        syntaxes.find_syntax_by_token(lang)
    };
    let (Some(syntax), Some(syn_theme)) = (syntax, themes.themes.get(theme.syntax_theme)) else {
        return plain_code_lines(code, theme);
    };

    let mut highlighter = HighlightLines::new(syntax, syn_theme);
    let mut lines = Vec::new();
    for line in LinesWithEndings::from(code) {
        match highlighter.highlight_line(line, syntaxes) {
            Ok(ranges) => {
                let spans: Vec<Span<'static>> = ranges
                    .into_iter()
                    .map(|(style, text)| {
                        let fg = style.foreground;
                        Span::styled(
                            text.trim_end_matches('\n').to_string(),
                            Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                        )
                    })
                    .collect();
                lines.push(Line::from(spans));
            }
            Err(_) => lines.push(Line::from(Span::styled(
                line.trim_end_matches('\n').to_string(),
                theme.code_block_style,
            ))),
        }
    }
    lines
}

fn plain_code_lines(code: &str, theme: &Theme) -> Vec<Line<'static>> {
    code.lines()
        .map(|line| Line::from(Span::styled(line.to_string(), theme.code_block_style)))
        .collect()
}
