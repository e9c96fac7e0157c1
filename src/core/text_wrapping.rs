//! Width-aware wrapping of styled lines.
//!
//! The transcript is pre-wrapped before rendering so scroll offsets are
//! exact: the renderer never re-wraps, it just windows the wrapped lines.
//! Wrapping is word-aware, falls back to hard breaks for words wider than
//! the viewport, and preserves span styles across break points.

use ratatui::style::Style;
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthChar;

pub fn wrap_lines(lines: &[Line<'_>], max_width: u16) -> Vec<Line<'static>> {
    lines
        .iter()
        .flat_map(|line| wrap_line(line, max_width))
        .collect()
}

pub fn wrap_line(line: &Line<'_>, max_width: u16) -> Vec<Line<'static>> {
    let max_width = max_width.max(1) as usize;

    let mut chars: Vec<(char, Style)> = Vec::new();
    for span in &line.spans {
        for ch in span.content.chars() {
            chars.push((ch, span.style));
        }
    }
    if chars.is_empty() {
        return vec![Line::default()];
    }

    let mut wrapped: Vec<Vec<(char, Style)>> = Vec::new();
    let mut current: Vec<(char, Style)> = Vec::new();
    let mut current_width = 0usize;
    let mut last_space: Option<usize> = None;

    for (ch, style) in chars {
        let ch_width = ch.width().unwrap_or(0);

        while current_width + ch_width > max_width && !current.is_empty() {
            if let Some(space_idx) = last_space {
                let remainder = current.split_off(space_idx + 1);
                wrapped.push(std::mem::take(&mut current));
                current = remainder;
            } else {
                wrapped.push(std::mem::take(&mut current));
            }
            current_width = current
                .iter()
                .map(|(c, _)| c.width().unwrap_or(0))
                .sum();
            last_space = current.iter().rposition(|(c, _)| *c == ' ');
        }

        // A space carried to the start of a fresh wrapped line would render
        // as ragged indentation.
        if ch == ' ' && current.is_empty() && !wrapped.is_empty() {
            continue;
        }
        if ch == ' ' {
            last_space = Some(current.len());
        }
        current.push((ch, style));
        current_width += ch_width;
    }
    wrapped.push(current);

    wrapped.into_iter().map(chars_to_line).collect()
}

fn chars_to_line(chars: Vec<(char, Style)>) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run = String::new();
    let mut run_style: Option<Style> = None;

    for (ch, style) in chars {
        match run_style {
            Some(current) if current == style => run.push(ch),
            Some(current) => {
                spans.push(Span::styled(std::mem::take(&mut run), current));
                run.push(ch);
                run_style = Some(style);
            }
            None => {
                run.push(ch);
                run_style = Some(style);
            }
        }
    }
    if let Some(style) = run_style {
        spans.push(Span::styled(run, style));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::style::{Color, Style};

    fn rendered(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.spans
                    .iter()
                    .map(|s| s.content.as_ref())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn wraps_at_word_boundaries() {
        let line = Line::from("the quick brown fox jumps");
        let wrapped = wrap_line(&line, 10);
        assert_eq!(rendered(&wrapped), ["the quick ", "brown fox ", "jumps"]);
    }

    #[test]
    fn hard_breaks_words_wider_than_the_viewport() {
        let line = Line::from("abcdefghijkl");
        let wrapped = wrap_line(&line, 5);
        assert_eq!(rendered(&wrapped), ["abcde", "fghij", "kl"]);
    }

    #[test]
    fn blank_lines_survive_wrapping() {
        let wrapped = wrap_line(&Line::default(), 10);
        assert_eq!(wrapped.len(), 1);
        assert!(wrapped[0].spans.is_empty());
    }

    #[test]
    fn styles_are_preserved_across_breaks() {
        let line = Line::from(vec![
            Span::styled("red words ", Style::default().fg(Color::Red)),
            Span::styled("blue words", Style::default().fg(Color::Blue)),
        ]);
        let wrapped = wrap_line(&line, 12);
        assert_eq!(wrapped.len(), 2);
        assert_eq!(wrapped[0].spans[0].style.fg, Some(Color::Red));
        assert_eq!(wrapped[1].spans.last().unwrap().style.fg, Some(Color::Blue));
    }

    #[test]
    fn wide_characters_count_double() {
        let line = Line::from("漢字漢字");
        let wrapped = wrap_line(&line, 4);
        assert_eq!(rendered(&wrapped), ["漢字", "漢字"]);
    }

    #[test]
    fn wrap_lines_flattens_multiple_sources() {
        let lines = vec![Line::from("one two three"), Line::from("four")];
        let wrapped = wrap_lines(&lines, 8);
        assert_eq!(rendered(&wrapped), ["one two ", "three", "four"]);
    }
}
