//! # Text Measurement
//!
//! Line breaking for the reference content measurer.
//!
//! Real glyph metrics belong to the writer that paints the table. For row
//! balancing all we need is a stable answer to "how many lines does this
//! paragraph take at this width", so every character is given the same
//! advance (`font_size * char_width`) and lines are broken greedily at UAX#14
//! opportunities.

use unicode_linebreak::{linebreaks, BreakOpportunity};

use crate::model::TextStyle;

/// A line of text after line-breaking.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokenLine {
    /// The text as a string, without the trailing break.
    pub text: String,
}

/// Compute UAX#14 break opportunities indexed by char position.
///
/// Returns a vec of length `text.chars().count()`. Each entry is the break
/// opportunity *before* that character position (i.e. "can we break before
/// char[i]?"). Index 0 is always `None` (no break before the first char).
fn compute_break_opportunities(text: &str) -> Vec<Option<BreakOpportunity>> {
    let char_count = text.chars().count();
    let mut result = vec![None; char_count];

    // linebreaks() yields (byte_offset, opportunity) where byte_offset is the
    // position AFTER the break, i.e. the start of the next segment.
    let byte_to_char: Vec<usize> = {
        let mut map = vec![0usize; text.len() + 1];
        let mut char_idx = 0;
        for (byte_idx, _) in text.char_indices() {
            map[byte_idx] = char_idx;
            char_idx += 1;
        }
        map[text.len()] = char_idx;
        map
    };

    for (byte_offset, opp) in linebreaks(text) {
        let char_idx = byte_to_char[byte_offset];
        if char_idx < char_count {
            result[char_idx] = Some(opp);
        }
    }

    result
}

fn is_newline(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

pub struct TextLayout;

impl Default for TextLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayout {
    pub fn new() -> Self {
        Self
    }

    /// Advance of a single character.
    fn advance(&self, style: &TextStyle) -> f64 {
        style.font_size * style.char_width
    }

    /// Break text into lines that fit within `max_width`.
    ///
    /// A word wider than the line is broken at the character that overflows.
    /// Trailing spaces don't count toward a line's width.
    pub fn break_into_lines(&self, text: &str, max_width: f64, style: &TextStyle) -> Vec<BrokenLine> {
        if text.is_empty() {
            return vec![];
        }

        let chars: Vec<char> = text.chars().collect();
        let breaks = compute_break_opportunities(text);
        let advance = self.advance(style);

        let mut lines = Vec::new();
        let mut line_start = 0;
        // Last allowed break inside the current line.
        let mut last_break: Option<usize> = None;
        let mut i = 0;

        while i < chars.len() {
            if let Some(BreakOpportunity::Mandatory) = breaks[i] {
                if i > line_start {
                    lines.push(self.make_line(&chars[line_start..i]));
                    line_start = i;
                    last_break = None;
                }
            } else if let Some(BreakOpportunity::Allowed) = breaks[i] {
                if i > line_start {
                    last_break = Some(i);
                }
            }

            let width = self.visible_width(&chars[line_start..=i], advance);
            if width > max_width && i > line_start && !chars[i].is_whitespace() {
                let end = last_break.unwrap_or(i);
                lines.push(self.make_line(&chars[line_start..end]));
                line_start = end;
                last_break = None;
                // Re-examine the char at the new line start.
                if end == i {
                    i += 1;
                }
                continue;
            }

            i += 1;
        }

        if line_start < chars.len() {
            lines.push(self.make_line(&chars[line_start..]));
        }

        lines
    }

    fn visible_width(&self, chars: &[char], advance: f64) -> f64 {
        let visible = chars
            .iter()
            .rev()
            .skip_while(|c| c.is_whitespace())
            .count();
        visible as f64 * advance
    }

    fn make_line(&self, chars: &[char]) -> BrokenLine {
        let text: String = chars
            .iter()
            .filter(|c| !is_newline(**c))
            .collect::<String>()
            .trim_end()
            .to_string();
        BrokenLine { text }
    }

    /// Height of the paragraph at the given width.
    pub fn measure_height(&self, text: &str, max_width: f64, style: &TextStyle) -> f64 {
        let lines = self.break_into_lines(text, max_width, style);
        lines.len() as f64 * style.line_pitch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style() -> TextStyle {
        TextStyle {
            font_size: 10.0,
            line_height: 1.2,
            char_width: 0.5,
        }
    }

    #[test]
    fn test_single_line() {
        let tl = TextLayout::new();
        let lines = tl.break_into_lines("Hello", 200.0, &style());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Hello");
    }

    #[test]
    fn test_line_break_at_space() {
        let tl = TextLayout::new();
        // Each char is 5pt wide; 40pt fits 8 chars.
        let lines = tl.break_into_lines("Hello World Again", 40.0, &style());
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "World", "Again"]);
    }

    #[test]
    fn test_explicit_newline() {
        let tl = TextLayout::new();
        let lines = tl.break_into_lines("one\ntwo\nthree", 500.0, &style());
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_empty_string() {
        let tl = TextLayout::new();
        assert!(tl.break_into_lines("", 100.0, &style()).is_empty());
        assert_eq!(tl.measure_height("", 100.0, &style()), 0.0);
    }

    #[test]
    fn test_long_word_forced_break() {
        let tl = TextLayout::new();
        let lines = tl.break_into_lines("abcdefghij", 20.0, &style());
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "abcd");
        assert_eq!(lines[2].text, "ij");
    }

    #[test]
    fn test_measure_height_counts_lines() {
        let tl = TextLayout::new();
        let h = tl.measure_height("a\nb\nc", 100.0, &style());
        assert!((h - 36.0).abs() < 0.001);
    }

    #[test]
    fn test_narrower_width_never_fewer_lines() {
        let tl = TextLayout::new();
        let text = "The quick brown fox jumps over the lazy dog";
        let wide = tl.break_into_lines(text, 300.0, &style()).len();
        let narrow = tl.break_into_lines(text, 60.0, &style()).len();
        assert!(narrow >= wide);
        assert_eq!(wide, 1);
    }
}
