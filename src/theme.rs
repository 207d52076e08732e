//! Colors for the form, the report and the markdown renderer
//!
//! Defaults are a dark red/zinc palette; any entry can be overridden from the
//! `[theme]` table of config.toml with a hex value.

use ratatui::style::Color;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub accent: Color,        // Focused borders, button, H2
    pub accent_bright: Color, // Selected option, H3+
    pub danger: Color,        // Error banner
    pub success: Color,       // Finished indicator
    pub warning: Color,       // Status line
    pub text: Color,          // Body text
    pub text_dim: Color,      // Hints, quotes, rules
    pub bg_selected: Color,   // Focused field
    pub inactive: Color,      // Unfocused borders
    pub header: Color,        // App title, H1
    pub code: Color,          // Inline and fenced code
    pub link: Color,          // Link labels
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(220, 38, 38),
            accent_bright: Color::Rgb(248, 113, 113),
            danger: Color::Rgb(239, 68, 68),
            success: Color::Rgb(134, 239, 172),
            warning: Color::Rgb(250, 179, 135),
            text: Color::Rgb(228, 228, 231),
            text_dim: Color::Rgb(161, 161, 170),
            bg_selected: Color::Rgb(63, 63, 70),
            inactive: Color::Rgb(82, 82, 91),
            header: Color::Rgb(250, 250, 250),
            code: Color::Rgb(253, 186, 116),
            link: Color::Rgb(147, 197, 253),
        }
    }
}

impl Theme {
    /// Defaults with the configured overrides applied
    pub fn from_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut theme = Self::default();

        for (key, value) in overrides {
            let Some(color) = parse_hex_color(value) else {
                tracing::warn!(key = %key, value = %value, "ignoring invalid theme color");
                continue;
            };
            let slot = match key.as_str() {
                "accent" => &mut theme.accent,
                "accent_bright" => &mut theme.accent_bright,
                "danger" => &mut theme.danger,
                "success" => &mut theme.success,
                "warning" => &mut theme.warning,
                "text" => &mut theme.text,
                "text_dim" => &mut theme.text_dim,
                "bg_selected" => &mut theme.bg_selected,
                "inactive" => &mut theme.inactive,
                "header" => &mut theme.header,
                "code" => &mut theme.code,
                "link" => &mut theme.link,
                _ => {
                    tracing::warn!(key = %key, "unknown theme key");
                    continue;
                }
            };
            *slot = color;
        }

        theme
    }
}

/// Parse a hex color string (#RRGGBB or #RGB)
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let s = s.trim().trim_start_matches('#');
    if !s.is_ascii() {
        return None;
    }

    if s.len() == 6 {
        let r = u8::from_str_radix(&s[0..2], 16).ok()?;
        let g = u8::from_str_radix(&s[2..4], 16).ok()?;
        let b = u8::from_str_radix(&s[4..6], 16).ok()?;
        Some(Color::Rgb(r, g, b))
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
        let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
        let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
        Some(Color::Rgb(r, g, b))
    } else {
        None
    }
}
