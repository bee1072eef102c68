use ratatui::style::Color;

use crate::app::NoticeLevel;
use crate::calendar::EventType;

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    pub title: Color,
    pub month_header: Color,
    pub selected_bg: Color,
    pub selected_fg: Color,
    pub today: Color,
    pub weekday_header: Color,
    pub inactive_day: Color,
    pub border: Color,
    pub status_bar: Color,
    pub help_title: Color,
    pub help_section: Color,
    pub command_mode: Color,
    pub info: Color,
    pub error: Color,
    pub success: Color,
}

/// `#rrggbb` to an RGB terminal color; anything else is gray.
pub fn hex_color(hex: &str) -> Color {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return Color::Gray;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
        _ => Color::Gray,
    }
}

impl Theme {
    pub fn default_theme() -> Self {
        Self {
            name: "default".to_string(),
            title: Color::Cyan,
            month_header: Color::Blue,
            selected_bg: Color::Blue,
            selected_fg: Color::White,
            today: Color::Green,
            weekday_header: Color::Yellow,
            inactive_day: Color::DarkGray,
            border: Color::Gray,
            status_bar: Color::White,
            help_title: Color::Cyan,
            help_section: Color::Yellow,
            command_mode: Color::White,
            info: Color::Cyan,
            error: Color::Red,
            success: Color::Green,
        }
    }

    /// The office's blue and slate palette.
    pub fn oiaa() -> Self {
        Self {
            name: "oiaa".to_string(),
            title: hex_color("#2563eb"),
            month_header: hex_color("#2563eb"),
            selected_bg: hex_color("#1e40af"),
            selected_fg: hex_color("#f8fafc"),
            today: hex_color("#22c55e"),
            weekday_header: hex_color("#94a3b8"),
            inactive_day: hex_color("#475569"),
            border: hex_color("#64748b"),
            status_bar: hex_color("#e2e8f0"),
            help_title: hex_color("#3b82f6"),
            help_section: hex_color("#f59e0b"),
            command_mode: hex_color("#e2e8f0"),
            info: hex_color("#3b82f6"),
            error: hex_color("#ef4444"),
            success: hex_color("#22c55e"),
        }
    }

    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            title: Color::Rgb(136, 192, 208),
            month_header: Color::Rgb(94, 129, 172),
            selected_bg: Color::Rgb(59, 66, 82),
            selected_fg: Color::Rgb(236, 239, 244),
            today: Color::Rgb(163, 190, 140),
            weekday_header: Color::Rgb(235, 203, 139),
            inactive_day: Color::Rgb(76, 86, 106),
            border: Color::Rgb(129, 161, 193),
            status_bar: Color::Rgb(216, 222, 233),
            help_title: Color::Rgb(136, 192, 208),
            help_section: Color::Rgb(235, 203, 139),
            command_mode: Color::Rgb(216, 222, 233),
            info: Color::Rgb(129, 161, 193),
            error: Color::Rgb(191, 97, 106),
            success: Color::Rgb(163, 190, 140),
        }
    }

    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),
            title: Color::Rgb(139, 233, 253),
            month_header: Color::Rgb(98, 114, 164),
            selected_bg: Color::Rgb(68, 71, 90),
            selected_fg: Color::Rgb(248, 248, 242),
            today: Color::Rgb(80, 250, 123),
            weekday_header: Color::Rgb(241, 250, 140),
            inactive_day: Color::Rgb(98, 114, 164),
            border: Color::Rgb(189, 147, 249),
            status_bar: Color::Rgb(248, 248, 242),
            help_title: Color::Rgb(139, 233, 253),
            help_section: Color::Rgb(241, 250, 140),
            command_mode: Color::Rgb(248, 248, 242),
            info: Color::Rgb(139, 233, 253),
            error: Color::Rgb(255, 85, 85),
            success: Color::Rgb(80, 250, 123),
        }
    }

    pub fn get_by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "oiaa" => Self::oiaa(),
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            _ => Self::default_theme(),
        }
    }

    pub fn available_themes() -> Vec<&'static str> {
        vec!["default", "oiaa", "nord", "dracula"]
    }

    pub fn type_color(&self, event_type: EventType) -> Color {
        hex_color(event_type.default_color())
    }

    pub fn notice_color(&self, level: NoticeLevel) -> Color {
        match level {
            NoticeLevel::Info => self.info,
            NoticeLevel::Success => self.success,
            NoticeLevel::Error => self.error,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_theme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!(hex_color("#ef4444"), Color::Rgb(239, 68, 68));
        assert_eq!(hex_color("#GGGGGG"), Color::Gray);
        assert_eq!(hex_color("red"), Color::Gray);
    }

    #[test]
    fn non_ascii_color_is_gray() {
        assert_eq!(hex_color("#aééb"), Color::Gray);
        assert_eq!(hex_color("#12345é"), Color::Gray);
    }

    #[test]
    fn unknown_theme_falls_back_to_default() {
        assert_eq!(Theme::get_by_name("solarized").name, "default");
        assert_eq!(Theme::get_by_name("OIAA").name, "oiaa");
    }

    #[test]
    fn every_listed_theme_resolves_to_itself() {
        for name in Theme::available_themes() {
            assert_eq!(Theme::get_by_name(name).name, name);
        }
    }
}
