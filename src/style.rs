//! Terminal styling: theme palette and SGR escape rendering.
//!
//! Reports are plain strings, so styling is applied by wrapping text in
//! 24-bit SGR escape sequences. When color is disabled every paint operation
//! is the identity, which keeps the formatter's control flow free of
//! color-mode branches.

/// Color palette used by the report renderer.
#[derive(Debug, Clone)]
pub struct ThemeColors {
    /// Default foreground color [r, g, b].
    pub fg: [u8; 3],
    /// The 16 ANSI colors [r, g, b] (indices 0–15).
    pub palette: [[u8; 3]; 16],
}

impl Default for ThemeColors {
    /// Catppuccin Mocha-inspired palette for vibrant, readable output.
    fn default() -> Self {
        Self {
            fg: [205, 214, 244],
            palette: [
                [69, 71, 90],    // 0  Black (Surface0)
                [243, 139, 168], // 1  Red
                [166, 227, 161], // 2  Green
                [249, 226, 175], // 3  Yellow (warm gold)
                [137, 180, 250], // 4  Blue
                [203, 166, 247], // 5  Magenta (mauve)
                [148, 226, 213], // 6  Cyan (teal)
                [186, 194, 222], // 7  White (Subtext0)
                [108, 112, 134], // 8  Bright black (Overlay0)
                [235, 160, 172], // 9  Bright red (maroon)
                [166, 227, 161], // 10 Bright green
                [249, 226, 175], // 11 Bright yellow
                [116, 199, 236], // 12 Bright blue (sapphire)
                [245, 194, 231], // 13 Bright magenta (pink)
                [137, 220, 235], // 14 Bright cyan (sky)
                [205, 214, 244], // 15 Bright white (Text)
            ],
        }
    }
}

/// A text style: optional foreground color plus attribute flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    /// Foreground color as [r, g, b]; `None` leaves the terminal default.
    pub fg: Option<[u8; 3]>,
    /// Bold attribute.
    pub bold: bool,
    /// Italic attribute.
    pub italic: bool,
    /// Underline attribute.
    pub underline: bool,
}

impl Style {
    /// A style with only a foreground color.
    pub fn fg(color: [u8; 3]) -> Self {
        Self {
            fg: Some(color),
            ..Default::default()
        }
    }

    /// Builder-style bold setter.
    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Builder-style italic setter.
    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    /// Builder-style underline setter.
    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Wrap `text` in this style's SGR sequences.
    ///
    /// When `enabled` is false, or the style has no attributes at all, the
    /// text is returned unchanged.
    pub fn paint(&self, text: &str, enabled: bool) -> String {
        if !enabled || *self == Style::default() {
            return text.to_string();
        }
        let mut codes: Vec<String> = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        if self.italic {
            codes.push("3".to_string());
        }
        if self.underline {
            codes.push("4".to_string());
        }
        if let Some([r, g, b]) = self.fg {
            codes.push(format!("38;2;{r};{g};{b}"));
        }
        format!("\x1b[{}m{}\x1b[0m", codes.join(";"), text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_disabled_is_identity() {
        let style = Style::fg([255, 0, 0]).bold();
        assert_eq!(style.paint("hello", false), "hello");
    }

    #[test]
    fn test_paint_empty_style_is_identity() {
        let style = Style::default();
        assert_eq!(style.paint("hello", true), "hello");
    }

    #[test]
    fn test_paint_fg_emits_truecolor_sgr() {
        let style = Style::fg([1, 2, 3]);
        assert_eq!(style.paint("x", true), "\x1b[38;2;1;2;3mx\x1b[0m");
    }

    #[test]
    fn test_paint_attributes_precede_color() {
        let style = Style::fg([9, 8, 7]).bold().italic().underline();
        assert_eq!(style.paint("x", true), "\x1b[1;3;4;38;2;9;8;7mx\x1b[0m");
    }

    #[test]
    fn test_default_theme_has_16_colors() {
        let theme = ThemeColors::default();
        assert_eq!(theme.palette.len(), 16);
        assert_eq!(theme.palette[1], [243, 139, 168]);
    }
}
