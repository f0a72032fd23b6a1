//! Width-aware reconstruction of console text from a raw cell grid.
//!
//! The console buffer is row-major, but its row boundaries do not always match
//! where text visibly wraps once double-width glyphs are involved. Lines are
//! therefore recomputed from per-cell column accounting instead of being cut
//! every `width` cells.

/// Classifies codepoints into one or two display columns by a fixed threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthRule {
    narrow_max: u32,
}

impl WidthRule {
    /// Codepoints `<= narrow_max` occupy one column, everything above two.
    pub fn new(narrow_max: u32) -> Self {
        Self { narrow_max }
    }

    /// Display columns occupied by `c` (1 or 2).
    pub fn width_of(&self, c: char) -> usize {
        if u32::from(c) <= self.narrow_max {
            1
        } else {
            2
        }
    }
}

impl Default for WidthRule {
    /// Basic Latin without DEL.
    fn default() -> Self {
        Self::new(0x7E)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReconstructor {
    rule: WidthRule,
}

impl TextReconstructor {
    pub fn new(rule: WidthRule) -> Self {
        Self { rule }
    }

    /// Split the first `width * height` cells into display lines.
    ///
    /// A line closes on the cell that brings the running column count to
    /// `width`. A double-width cell that would overflow the line instead starts
    /// the next one, the way the console wraps it. This differs from a plain
    /// inclusive cut, which would keep that cell and leave the line one column
    /// over `width`. With `width >= 2` no line is ever wider than `width`.
    /// Blank cells are kept as-is and the trailing partial line is always
    /// emitted.
    pub fn reconstruct(&self, cells: &[char], width: usize, height: usize) -> Vec<String> {
        if width == 0 {
            return Vec::new();
        }
        let cells = &cells[..cells.len().min(width.saturating_mul(height))];

        let mut lines: Vec<String> = Vec::new();
        let mut start = 0;
        let mut columns = 0;

        for (i, &c) in cells.iter().enumerate() {
            let w = self.rule.width_of(c);

            if columns > 0 && columns + w > width {
                lines.push(cells[start..i].iter().collect());
                start = i;
                columns = 0;
            }

            columns += w;
            if columns >= width {
                lines.push(cells[start..=i].iter().collect());
                start = i + 1;
                columns = 0;
            }
        }

        if start < cells.len() {
            lines.push(cells[start..].iter().collect());
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn display_width(line: &str, rule: WidthRule) -> usize {
        line.chars().map(|c| rule.width_of(c)).sum()
    }

    #[test]
    fn test_width_rule_threshold() {
        let rule = WidthRule::default();
        assert_eq!(rule.width_of('A'), 1);
        assert_eq!(rule.width_of('~'), 1);
        assert_eq!(rule.width_of('\u{7F}'), 2);
        assert_eq!(rule.width_of('あ'), 2);
        assert_eq!(rule.width_of('é'), 2);
    }

    #[test]
    fn test_width_rule_is_configurable() {
        let rule = WidthRule::new(0xFF);
        assert_eq!(rule.width_of('é'), 1);
        assert_eq!(rule.width_of('あ'), 2);
    }

    #[test]
    fn test_ascii_grid_splits_on_rows() {
        let r = TextReconstructor::default();
        let lines = r.reconstruct(&chars("abcdefghij"), 5, 2);
        assert_eq!(lines, vec!["abcde", "fghij"]);
    }

    #[test]
    fn test_wide_glyphs_wrap_early() {
        let r = TextReconstructor::default();
        // 'あ' counts two columns: "aあb" fills 4 columns of a width-4 line.
        let lines = r.reconstruct(&chars("aあbcdef"), 4, 2);
        assert_eq!(lines, vec!["aあb", "cdef"]);
    }

    #[test]
    fn test_wide_glyph_that_would_overflow_starts_next_line() {
        let r = TextReconstructor::default();
        let lines = r.reconstruct(&chars("abcあde"), 4, 2);
        assert_eq!(lines, vec!["abc", "あde"]);
    }

    #[test]
    fn test_trailing_partial_line_emitted() {
        let r = TextReconstructor::default();
        let lines = r.reconstruct(&chars("abcdefg"), 5, 2);
        assert_eq!(lines, vec!["abcde", "fg"]);
    }

    #[test]
    fn test_blank_cells_preserved() {
        let r = TextReconstructor::default();
        let lines = r.reconstruct(&chars("ab   cd   "), 5, 2);
        assert_eq!(lines, vec!["ab   ", "cd   "]);
    }

    #[test]
    fn test_cells_beyond_grid_ignored() {
        let r = TextReconstructor::default();
        let lines = r.reconstruct(&chars("abcdefXYZ"), 3, 2);
        assert_eq!(lines, vec!["abc", "def"]);
    }

    #[test]
    fn test_zero_width_yields_nothing() {
        let r = TextReconstructor::default();
        assert!(r.reconstruct(&chars("abc"), 0, 3).is_empty());
    }

    #[test]
    fn test_empty_input() {
        let r = TextReconstructor::default();
        assert!(r.reconstruct(&[], 10, 2).is_empty());
    }

    #[test]
    fn test_wide_cell_never_overflows_line() {
        let rule = WidthRule::default();
        let r = TextReconstructor::new(rule);
        // An inclusive cut at 5 columns would give "abcdあ" (6 columns).
        let lines = r.reconstruct(&chars("abcdあefgh"), 5, 3);
        assert_eq!(lines, vec!["abcd", "あefg", "h"]);
        assert!(lines.iter().all(|l| display_width(l, rule) <= 5));
    }

    #[test]
    fn test_deterministic() {
        let r = TextReconstructor::default();
        let cells = chars("漢字まじりのtext行です and more ascii");
        let first = r.reconstruct(&cells, 7, 10);
        let second = r.reconstruct(&cells, 7, 10);
        assert_eq!(first, second);
    }

    #[test]
    fn test_column_width_property() {
        let rule = WidthRule::default();
        let r = TextReconstructor::new(rule);
        let cells = chars("ab漢c字dまeじfりg の h text 行 で す xyz 全角ＡＢＣ mixed");

        for width in 2..12 {
            let lines = r.reconstruct(&cells, width, 100);
            assert_eq!(lines.concat(), cells.iter().collect::<String>());

            for (idx, line) in lines.iter().enumerate() {
                assert!(display_width(line, rule) <= width, "line {line:?} too wide");

                if idx + 1 < lines.len() {
                    let next = lines[idx + 1].chars().next().unwrap();
                    assert!(
                        display_width(line, rule) + rule.width_of(next) > width,
                        "line {line:?} closed early at width {width}"
                    );
                }
            }
        }
    }
}
