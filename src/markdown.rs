//! Streaming markdown renderer
//!
//! Turns the accumulated report into styled, pre-wrapped ratatui lines. Source
//! lines terminated by `\n` are rendered once and cached; each update only
//! renders newly completed lines plus the trailing partial line. Each source
//! line is parsed on its own with pulldown-cmark, and code fences are tracked
//! across lines here, so cached output never has to be revisited while text is
//! only appended.
//!
//! The trailing partial line is rendered optimistically: closers are appended
//! for any emphasis, code or link still open, so a `**` that is about to be
//! closed styles the rest of the line instead of flashing up literally.

use pulldown_cmark::{Event, Options, Parser as MdParser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::theme::Theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fence {
    marker: char,
    len: usize,
}

/// Block a single source line turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Paragraph,
    Heading(usize),
    Quote,
    Bullet,
    Ordered(u64),
    Rule,
}

pub struct MarkdownView {
    theme: Theme,
    width: u16,
    /// Source text covered by `cache`, always ending at a line break
    consumed: String,
    fence: Option<Fence>,
    cache: Vec<Line<'static>>,
    tail: Vec<Line<'static>>,
    /// Number of complete source lines rendered since the last reset
    rendered: usize,
}

impl MarkdownView {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            width: 0,
            consumed: String::new(),
            fence: None,
            cache: Vec::new(),
            tail: Vec::new(),
            rendered: 0,
        }
    }

    pub fn reset(&mut self) {
        self.consumed.clear();
        self.fence = None;
        self.cache.clear();
        self.tail.clear();
        self.rendered = 0;
    }

    /// Bring the view up to date with `text` laid out for `width` columns
    pub fn update(&mut self, text: &str, width: u16) {
        if width != self.width || !text.starts_with(self.consumed.as_str()) {
            if !self.consumed.is_empty() {
                tracing::trace!(width, "markdown cache rebuilt");
            }
            self.reset();
            self.width = width;
        }

        let rest = &text[self.consumed.len()..];
        let complete = rest.rfind('\n').map(|i| i + 1).unwrap_or(0);

        for raw in rest[..complete].split_terminator('\n') {
            let mut fence = self.fence;
            let lines = self.render_line(raw, &mut fence, false);
            self.fence = fence;
            self.cache.extend(lines);
            self.rendered += 1;
        }
        self.consumed.push_str(&rest[..complete]);

        let partial = &rest[complete..];
        self.tail = if partial.is_empty() {
            Vec::new()
        } else {
            let mut fence = self.fence;
            self.render_line(partial, &mut fence, true)
        };
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line<'static>> {
        self.cache.iter().chain(self.tail.iter())
    }

    /// Rows the document occupies at the current width
    pub fn height(&self) -> usize {
        self.cache.len() + self.tail.len()
    }

    fn render_line(&self, raw: &str, fence: &mut Option<Fence>, partial: bool) -> Vec<Line<'static>> {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let trimmed = raw.trim_start();
        let indent = raw.len() - trimmed.len();
        let width = usize::from(self.width);
        let t = &self.theme;

        if let Some(open) = *fence {
            if closes_fence(trimmed, open) {
                *fence = None;
                return Vec::new();
            }
            let spans = vec![
                Span::raw("  "),
                Span::styled(raw.to_string(), Style::default().fg(t.code)),
            ];
            return wrap_spans(spans, width, 2);
        }

        if let Some(open) = opens_fence(trimmed) {
            *fence = Some(open);
            let lang = trimmed.trim_start_matches(open.marker).trim();
            if lang.is_empty() {
                return Vec::new();
            }
            return vec![Line::from(Span::styled(
                format!("  {lang}"),
                Style::default().fg(t.text_dim).add_modifier(Modifier::ITALIC),
            ))];
        }

        if trimmed.is_empty() {
            return vec![Line::default()];
        }

        if is_table_row(trimmed) {
            return vec![truncate_line(self.table_row(trimmed), width)];
        }

        if partial && trimmed.chars().all(|c| c == '#') {
            // Could still become a heading
            return vec![Line::default()];
        }

        let (block, spans) = if partial {
            self.parse(&close_open_markers(trimmed))
        } else {
            self.parse(trimmed)
        };

        match block {
            Block::Rule => vec![self.rule_line()],
            Block::Heading(level) => {
                let base = match level {
                    1 => Style::default().fg(t.header).add_modifier(Modifier::BOLD),
                    2 => Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
                    _ => Style::default().fg(t.accent_bright).add_modifier(Modifier::BOLD),
                };
                let mut lines = wrap_spans(restyle(spans, base), width, 0);
                if level == 1 && !partial {
                    lines.push(self.rule_line());
                }
                lines
            }
            Block::Quote => {
                let base = Style::default().fg(t.text_dim).add_modifier(Modifier::ITALIC);
                let mut out = vec![Span::styled("│ ", Style::default().fg(t.inactive))];
                out.extend(restyle(spans, base));
                wrap_spans(out, width, 2)
            }
            Block::Bullet => {
                let mut out = vec![
                    Span::raw(" ".repeat(indent)),
                    Span::styled("• ", Style::default().fg(t.accent)),
                ];
                out.extend(restyle(spans, Style::default().fg(t.text)));
                wrap_spans(out, width, indent + 2)
            }
            Block::Ordered(number) => {
                let marker = format!("{number}. ");
                let hang = indent + marker.width();
                let mut out = vec![
                    Span::raw(" ".repeat(indent)),
                    Span::styled(marker, Style::default().fg(t.accent).add_modifier(Modifier::BOLD)),
                ];
                out.extend(restyle(spans, Style::default().fg(t.text)));
                wrap_spans(out, width, hang)
            }
            Block::Paragraph => {
                let mut out = Vec::new();
                if indent > 0 {
                    out.push(Span::raw(" ".repeat(indent)));
                }
                out.extend(restyle(spans, Style::default().fg(t.text)));
                wrap_spans(out, width, indent)
            }
        }
    }

    /// Parse one source line. Returned spans carry only the inline styling
    /// (emphasis, code, links); the caller lays the block style under them.
    fn parse(&self, source: &str) -> (Block, Vec<Span<'static>>) {
        let t = &self.theme;
        let mut block = Block::Paragraph;
        let mut stack = vec![Style::default()];
        let mut spans: Vec<Span<'static>> = Vec::new();

        for event in MdParser::new_ext(source, Options::ENABLE_STRIKETHROUGH) {
            let current = stack.last().copied().unwrap_or_default();
            match event {
                Event::Start(Tag::Heading { level, .. }) if block == Block::Paragraph => {
                    block = Block::Heading(level as usize);
                }
                Event::Start(Tag::BlockQuote(_)) if block == Block::Paragraph => {
                    block = Block::Quote;
                }
                Event::Start(Tag::List(start)) if block == Block::Paragraph => {
                    block = start.map_or(Block::Bullet, Block::Ordered);
                }
                Event::Rule if block == Block::Paragraph => block = Block::Rule,

                Event::Start(Tag::Emphasis) => stack.push(current.add_modifier(Modifier::ITALIC)),
                Event::Start(Tag::Strong) => stack.push(current.add_modifier(Modifier::BOLD)),
                Event::Start(Tag::Strikethrough) => {
                    stack.push(current.add_modifier(Modifier::CROSSED_OUT))
                }
                Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                    stack.push(current.fg(t.link).add_modifier(Modifier::UNDERLINED))
                }
                Event::End(
                    TagEnd::Emphasis
                    | TagEnd::Strong
                    | TagEnd::Strikethrough
                    | TagEnd::Link
                    | TagEnd::Image,
                ) => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }

                Event::Text(text) | Event::Html(text) | Event::InlineHtml(text) => {
                    push_text(&mut spans, &text, current);
                }
                Event::Code(code) => push_text(&mut spans, &code, current.fg(t.code)),
                Event::SoftBreak | Event::HardBreak => push_text(&mut spans, " ", current),
                _ => {}
            }
        }

        (block, spans)
    }

    /// Inline content of a table cell; block syntax inside a cell stays literal
    fn cell(&self, text: &str) -> Vec<Span<'static>> {
        let base = Style::default().fg(self.theme.text);
        match self.parse(text) {
            (Block::Paragraph, spans) => restyle(spans, base),
            _ => vec![Span::styled(text.to_string(), base)],
        }
    }

    fn rule_line(&self) -> Line<'static> {
        let len = usize::from(self.width).max(3);
        Line::from(Span::styled(
            "─".repeat(len),
            Style::default().fg(self.theme.inactive),
        ))
    }

    fn table_row(&self, row: &str) -> Line<'static> {
        let sep = Style::default().fg(self.theme.inactive);
        let inner = row.trim().trim_start_matches('|');
        let inner = inner.strip_suffix('|').unwrap_or(inner);

        let is_divider = inner
            .chars()
            .all(|c| matches!(c, '-' | ':' | '|' | ' '));
        if is_divider {
            let cells: Vec<String> = inner
                .split('|')
                .map(|cell| "─".repeat(cell.chars().count().max(1)))
                .collect();
            return Line::from(Span::styled(format!("├{}┤", cells.join("┼")), sep));
        }

        let mut spans = vec![Span::styled("│", sep)];
        for cell in inner.split('|') {
            spans.push(Span::raw(" "));
            spans.extend(self.cell(cell.trim()));
            spans.push(Span::raw(" "));
            spans.push(Span::styled("│", sep));
        }
        Line::from(spans)
    }
}

/// Append to the last span when the style matches, so words are not split
/// across spans by the parser's event boundaries
fn push_text(spans: &mut Vec<Span<'static>>, text: &str, style: Style) {
    if text.is_empty() {
        return;
    }
    match spans.last_mut() {
        Some(last) if last.style == style => last.content.to_mut().push_str(text),
        _ => spans.push(Span::styled(text.to_string(), style)),
    }
}

fn restyle(spans: Vec<Span<'static>>, base: Style) -> Vec<Span<'static>> {
    spans
        .into_iter()
        .map(|span| {
            let style = base.patch(span.style);
            span.style(style)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Open {
    Emphasis(char, usize),
    Label,
    Destination(usize),
}

/// Close whatever inline markup is still open at the end of a partial line.
///
/// A marker run at the very end is dropped since it has nothing to style yet.
fn close_open_markers(text: &str) -> String {
    let core = text
        .trim_end()
        .trim_end_matches(['*', '_', '`', '['])
        .trim_end();
    let chars: Vec<char> = core.chars().collect();

    let mut stack: Vec<Open> = Vec::new();
    let mut code_closer: Option<usize> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(Open::Destination(depth)) = stack.last().copied() {
            match c {
                '(' => {
                    stack.pop();
                    stack.push(Open::Destination(depth + 1));
                }
                ')' if depth == 0 => {
                    stack.pop();
                }
                ')' => {
                    stack.pop();
                    stack.push(Open::Destination(depth - 1));
                }
                _ => {}
            }
            i += 1;
            continue;
        }

        match c {
            '\\' => i += 2,
            '`' => {
                let run = run_len(&chars, i);
                match find_backtick_run(&chars, i + run, run) {
                    Some(end) => i = end + run,
                    None => {
                        // Everything after an unclosed backtick run is code
                        code_closer = Some(run);
                        break;
                    }
                }
            }
            '*' | '_' => {
                let run = run_len(&chars, i);
                let prev = i.checked_sub(1).map(|p| chars[p]);
                let next = chars.get(i + run).copied();
                let can_close = prev.is_some_and(|p| !p.is_whitespace());
                let can_open = next.is_some_and(|n| !n.is_whitespace())
                    && !(c == '_' && prev.is_some_and(char::is_alphanumeric));

                if can_close && stack.last() == Some(&Open::Emphasis(c, run)) {
                    stack.pop();
                } else if can_open {
                    stack.push(Open::Emphasis(c, run));
                }
                i += run;
            }
            '[' => {
                stack.push(Open::Label);
                i += 1;
            }
            ']' if stack.last() == Some(&Open::Label) => {
                stack.pop();
                if chars.get(i + 1) == Some(&'(') {
                    stack.push(Open::Destination(0));
                    i += 1;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    let mut out = core.to_string();
    if let Some(run) = code_closer {
        out.push_str(&"`".repeat(run));
    }
    for open in stack.iter().rev() {
        match open {
            Open::Emphasis(c, run) => out.extend(std::iter::repeat(*c).take(*run)),
            Open::Label => out.push_str("]()"),
            Open::Destination(depth) => out.push_str(&")".repeat(depth + 1)),
        }
    }
    out
}

fn run_len(chars: &[char], start: usize) -> usize {
    chars[start..].iter().take_while(|c| **c == chars[start]).count()
}

/// Index of the next backtick run of exactly `run` characters
fn find_backtick_run(chars: &[char], from: usize, run: usize) -> Option<usize> {
    let mut i = from;
    while i < chars.len() {
        if chars[i] == '`' {
            let len = run_len(chars, i);
            if len == run {
                return Some(i);
            }
            i += len;
        } else {
            i += 1;
        }
    }
    None
}

fn opens_fence(trimmed: &str) -> Option<Fence> {
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    (len >= 3).then_some(Fence { marker, len })
}

fn closes_fence(trimmed: &str, open: Fence) -> bool {
    let len = trimmed.chars().take_while(|c| *c == open.marker).count();
    len >= open.len && trimmed[len..].trim().is_empty()
}

fn is_table_row(trimmed: &str) -> bool {
    trimmed.starts_with('|') && trimmed.matches('|').count() >= 2
}

/// Greedy word wrap over styled spans. Continuation rows are indented by
/// `hang` columns so list bodies line up under their first word.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize, hang: usize) -> Vec<Line<'static>> {
    if width == 0 {
        return vec![Line::from(spans)];
    }
    let hang = if hang * 2 >= width { 0 } else { hang };

    enum Atom {
        Space(String, Style),
        Word(Vec<(String, Style)>),
    }

    let mut atoms: Vec<Atom> = Vec::new();
    for span in spans {
        let style = span.style;
        let mut buf = String::new();
        let mut in_space: Option<bool> = None;
        for c in span.content.chars() {
            let space = c == ' ';
            if in_space.is_some_and(|s| s != space) {
                push_atom(&mut atoms, std::mem::take(&mut buf), style, in_space == Some(true));
            }
            in_space = Some(space);
            buf.push(c);
        }
        if !buf.is_empty() {
            push_atom(&mut atoms, buf, style, in_space == Some(true));
        }
    }

    fn push_atom(atoms: &mut Vec<Atom>, text: String, style: Style, space: bool) {
        if space {
            atoms.push(Atom::Space(text, style));
            return;
        }
        // Adjacent spans without whitespace between them form one word
        if let Some(Atom::Word(parts)) = atoms.last_mut() {
            parts.push((text, style));
        } else {
            atoms.push(Atom::Word(vec![(text, style)]));
        }
    }

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut used = 0usize;
    let mut pending_space: Option<(String, Style)> = None;

    for atom in atoms {
        match atom {
            Atom::Space(text, style) => {
                if used == 0 && lines.is_empty() {
                    // Leading indentation of the first row is kept
                    used += text.width();
                    current.push(Span::styled(text, style));
                } else {
                    pending_space = Some((text, style));
                }
            }
            Atom::Word(parts) => {
                let word_width: usize = parts.iter().map(|(t, _)| t.width()).sum();
                let space_width = pending_space.as_ref().map_or(0, |(t, _)| t.width());

                let at_row_start = used == 0 || (!lines.is_empty() && used == hang);
                if !at_row_start && used + space_width + word_width > width {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    current.push(Span::raw(" ".repeat(hang)));
                    used = hang;
                    pending_space = None;
                }

                if let Some((text, style)) = pending_space.take() {
                    if used > 0 && !(!lines.is_empty() && used == hang && current.len() == 1) {
                        used += text.width();
                        current.push(Span::styled(text, style));
                    }
                }

                for (text, style) in parts {
                    let w = text.width();
                    if used + w <= width {
                        used += w;
                        current.push(Span::styled(text, style));
                        continue;
                    }
                    // Longer than a whole row: hard break
                    let mut chunk = String::new();
                    for ch in text.chars() {
                        let cw = ch.width().unwrap_or(0);
                        if used + cw > width && used > hang {
                            current.push(Span::styled(std::mem::take(&mut chunk), style));
                            lines.push(Line::from(std::mem::take(&mut current)));
                            current.push(Span::raw(" ".repeat(hang)));
                            used = hang;
                        }
                        used += cw;
                        chunk.push(ch);
                    }
                    if !chunk.is_empty() {
                        current.push(Span::styled(chunk, style));
                    }
                }
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

fn truncate_line(line: Line<'static>, width: usize) -> Line<'static> {
    if width == 0 || line.width() <= width {
        return line;
    }
    let mut used = 0usize;
    let mut spans = Vec::new();
    for span in line.spans {
        let style = span.style;
        let mut kept = String::new();
        for ch in span.content.chars() {
            let cw = ch.width().unwrap_or(0);
            if used + cw > width.saturating_sub(1) {
                spans.push(Span::styled(kept, style));
                spans.push(Span::styled("…", style));
                return Line::from(spans);
            }
            used += cw;
            kept.push(ch);
        }
        spans.push(Span::styled(kept, style));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(text: &str, width: u16) -> MarkdownView {
        let mut v = MarkdownView::new(Theme::default());
        v.update(text, width);
        v
    }

    fn plain(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn rows(v: &MarkdownView) -> Vec<String> {
        v.lines().map(plain).collect()
    }

    fn span_with<'a>(line: &'a Line<'static>, text: &str) -> &'a Span<'static> {
        line.spans
            .iter()
            .find(|s| s.content == text)
            .unwrap_or_else(|| panic!("no span {text:?} in {:?}", plain(line)))
    }

    #[test]
    fn test_headings_and_h1_rule() {
        let v = view("# CHANNEL POSITIONING\n## Sub ##\n", 30);
        assert_eq!(
            rows(&v),
            vec!["CHANNEL POSITIONING".to_string(), "─".repeat(30), "Sub".to_string()]
        );
        let sub = v.lines().find(|l| plain(l) == "Sub").unwrap();
        assert!(sub.spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_heading_requires_space() {
        let v = view("#hashtag\n### Title ###\n", 40);
        assert_eq!(rows(&v), vec!["#hashtag", "Title"]);
        let title = v.lines().nth(1).unwrap();
        assert_eq!(title.spans[0].style.fg, Some(Theme::default().accent_bright));
        let tag = v.lines().next().unwrap();
        assert_eq!(tag.spans[0].style.fg, Some(Theme::default().text));
    }

    #[test]
    fn test_lists_render_with_glyphs() {
        let v = view("- Core niche\n  - Nested\n3. Third\n", 40);
        assert_eq!(rows(&v), vec!["• Core niche", "  • Nested", "3. Third"]);
    }

    #[test]
    fn test_inline_emphasis_and_code() {
        let v = view("Use **vidIQ** and *TubeBuddy* with `tags` or ***both***\n", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "Use vidIQ and TubeBuddy with tags or both");
        assert!(span_with(line, "vidIQ").style.add_modifier.contains(Modifier::BOLD));
        assert!(span_with(line, "TubeBuddy").style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(span_with(line, "tags").style.fg, Some(Theme::default().code));
        let both = span_with(line, "both").style.add_modifier;
        assert!(both.contains(Modifier::BOLD | Modifier::ITALIC));
    }

    #[test]
    fn test_code_span_binds_tighter_than_strong() {
        let v = view("**bold `code**` tail**\n", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "bold code** tail");
        let code = span_with(line, "code**");
        assert_eq!(code.style.fg, Some(Theme::default().code));
        assert!(span_with(line, "tail").style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_snake_case_and_lone_stars_stay_literal() {
        let v = view("call my_var_name and 5 * 3 = 15\n", 80);
        assert_eq!(rows(&v), vec!["call my_var_name and 5 * 3 = 15"]);
    }

    #[test]
    fn test_unclosed_marker_literal_once_line_completes() {
        let v = view("a **b\n", 80);
        assert_eq!(rows(&v), vec!["a **b"]);
    }

    #[test]
    fn test_partial_tail_styles_optimistically() {
        let v = view("Title: **Grow fa", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "Title: Grow fa");
        assert!(span_with(line, "Grow").style.add_modifier.contains(Modifier::BOLD));
        assert!(span_with(line, "fa").style.add_modifier.contains(Modifier::BOLD));

        let v = view("Ends with **", 80);
        assert_eq!(rows(&v), vec!["Ends with"]);

        let v = view("see [vidIQ](https://vid", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "see vidIQ");

        let v = view("run `cargo te", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "run cargo te");
        assert_eq!(span_with(line, "te").style.fg, Some(Theme::default().code));
    }

    #[test]
    fn test_close_open_markers() {
        assert_eq!(close_open_markers("**bold *both"), "**bold *both***");
        assert_eq!(close_open_markers("**done** and `co"), "**done** and `co`");
        assert_eq!(close_open_markers("[Wiki](https://x.org/Foo_(ba"), "[Wiki](https://x.org/Foo_(ba))");
        assert_eq!(close_open_markers("[label"), "[label]()");
        assert_eq!(close_open_markers("snake_case and 5 * 3"), "snake_case and 5 * 3");
        assert_eq!(close_open_markers("trailing __"), "trailing");
    }

    #[test]
    fn test_links_show_label() {
        let v = view("Try [Ahrefs](https://ahrefs.com) today\n", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "Try Ahrefs today");
        let label = span_with(line, "Ahrefs");
        assert!(label.style.add_modifier.contains(Modifier::UNDERLINED));
    }

    #[test]
    fn test_link_destination_with_parentheses() {
        let v = view("See [Wiki](https://en.wikipedia.org/wiki/Foo_(bar)) now\n", 80);
        let line = v.lines().next().unwrap();
        assert_eq!(plain(line), "See Wiki now");
        assert_eq!(span_with(line, "Wiki").style.fg, Some(Theme::default().link));
    }

    #[test]
    fn test_code_fence_is_verbatim() {
        let v = view("```rust\nlet **x** = 1;\n```\nafter\n", 40);
        assert_eq!(rows(&v), vec!["  rust", "  let **x** = 1;", "after"]);
    }

    #[test]
    fn test_rule_and_quote() {
        let v = view("---\n> Be practical\n", 20);
        let r = rows(&v);
        assert_eq!(r[0], "─".repeat(20));
        assert_eq!(r[1], "│ Be practical");
    }

    #[test]
    fn test_word_wrap_hangs_list_body() {
        let v = view("- alpha beta gamma delta\n", 12);
        assert_eq!(rows(&v), vec!["• alpha beta", "  gamma", "  delta"]);
    }

    #[test]
    fn test_long_word_hard_breaks() {
        let v = view("abcdefghij\n", 4);
        assert_eq!(rows(&v), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_table_rows() {
        let v = view("| Day | Upload |\n|---|---|\n| Mon | **Short** |\n", 40);
        let r = rows(&v);
        assert_eq!(r[0], "│ Day │ Upload │");
        assert!(r[1].starts_with('├') && r[1].contains('┼'));
        assert_eq!(r[2], "│ Mon │ Short │");
        let row = v.lines().nth(2).unwrap();
        assert!(span_with(row, "Short").style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_table_rows_truncate() {
        let v = view("| aaaaaaaaaa | bbbbbbbbbb |\n", 10);
        let r = rows(&v);
        assert_eq!(r.len(), 1);
        assert!(r[0].ends_with('…'));
        assert!(r[0].chars().count() <= 10);
    }

    #[test]
    fn test_incremental_updates_reuse_cache() {
        let mut v = MarkdownView::new(Theme::default());
        v.update("# Title\nfirst", 40);
        assert_eq!(v.rendered, 1);
        v.update("# Title\nfirst line\nsec", 40);
        assert_eq!(v.rendered, 2);
        v.update("# Title\nfirst line\nsecond\n", 40);
        assert_eq!(v.rendered, 3);

        let mut fresh = MarkdownView::new(Theme::default());
        fresh.update("# Title\nfirst line\nsecond\n", 40);
        assert_eq!(rows(&v), rows(&fresh));
    }

    #[test]
    fn test_fragment_by_fragment_matches_one_shot() {
        let doc = "# 5️⃣ 10 STARTER VIDEO IDEAS\n\n1. **Title idea**: Budget *like* a pro\n   - Why: `search` demand\n\n```\ncode\n```\n> done\n";
        let mut streamed = MarkdownView::new(Theme::default());
        let mut acc = String::new();
        for ch in doc.chars() {
            acc.push(ch);
            streamed.update(&acc, 30);
        }
        let one_shot = view(doc, 30);
        assert!(streamed.lines().eq(one_shot.lines()));
        assert_eq!(streamed.rendered, doc.matches('\n').count());
    }

    #[test]
    fn test_width_change_or_new_text_rebuilds() {
        let mut v = MarkdownView::new(Theme::default());
        v.update("one two three\n", 40);
        assert_eq!(v.height(), 1);
        v.update("one two three\n", 8);
        assert_eq!(v.height(), 2);
        v.update("different\n", 8);
        assert_eq!(rows(&v), vec!["differen", "t"]);
    }

    #[test]
    fn test_partial_fence_does_not_leak_into_cache() {
        let mut v = MarkdownView::new(Theme::default());
        v.update("```", 40);
        v.update("```\n", 40);
        v.update("```\n**x**\n", 40);
        assert_eq!(rows(&v), vec!["  **x**"]);
    }
}
