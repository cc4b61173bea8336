use ratatui::style::Color;

pub struct Theme {
    pub id: &'static str,
    pub name: &'static str,
    pub primary_accent: Color,
    pub secondary_accent: Color,
    pub correct_text: Color,
    pub error_text: Color,
    pub label_text: Color,
    pub remaining_text: Color,
    pub border: Color,
    pub selected_bg: Color,
}

const fn hex(value: u32) -> Color {
    Color::Rgb((value >> 16) as u8, (value >> 8) as u8, value as u8)
}

pub static THEMES: [Theme; 6] = [
    Theme {
        id: "default",
        name: "Default",
        primary_accent: hex(0xe2b714),
        secondary_accent: hex(0x7aa2f7),
        correct_text: hex(0xd1d0c5),
        error_text: hex(0xca4754),
        label_text: hex(0x8a8a8a),
        remaining_text: hex(0x646669),
        border: hex(0x3c3c3c),
        selected_bg: hex(0x2c2e31),
    },
    Theme {
        id: "gruvbox",
        name: "Gruvbox",
        primary_accent: hex(0xfabd2f),
        secondary_accent: hex(0x83a598),
        correct_text: hex(0xebdbb2),
        error_text: hex(0xfb4934),
        label_text: hex(0xa89984),
        remaining_text: hex(0x665c54),
        border: hex(0x504945),
        selected_bg: hex(0x3c3836),
    },
    Theme {
        id: "tokyonight",
        name: "Tokyo Night",
        primary_accent: hex(0x7aa2f7),
        secondary_accent: hex(0xbb9af7),
        correct_text: hex(0xc0caf5),
        error_text: hex(0xf7768e),
        label_text: hex(0x9aa5ce),
        remaining_text: hex(0x565f89),
        border: hex(0x3b4261),
        selected_bg: hex(0x292e42),
    },
    Theme {
        id: "catppuccin",
        name: "Catppuccin",
        primary_accent: hex(0xcba6f7),
        secondary_accent: hex(0x89b4fa),
        correct_text: hex(0xcdd6f4),
        error_text: hex(0xf38ba8),
        label_text: hex(0xa6adc8),
        remaining_text: hex(0x6c7086),
        border: hex(0x45475a),
        selected_bg: hex(0x313244),
    },
    Theme {
        id: "dracula",
        name: "Dracula",
        primary_accent: hex(0xbd93f9),
        secondary_accent: hex(0xff79c6),
        correct_text: hex(0xf8f8f2),
        error_text: hex(0xff5555),
        label_text: hex(0x8be9fd),
        remaining_text: hex(0x6272a4),
        border: hex(0x44475a),
        selected_bg: hex(0x383a59),
    },
    Theme {
        id: "nord",
        name: "Nord",
        primary_accent: hex(0x88c0d0),
        secondary_accent: hex(0x81a1c1),
        correct_text: hex(0xeceff4),
        error_text: hex(0xbf616a),
        label_text: hex(0xd8dee9),
        remaining_text: hex(0x4c566a),
        border: hex(0x434c5e),
        selected_bg: hex(0x3b4252),
    },
];

pub fn find_theme(id: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|theme| theme.id == id)
}

/// Unknown ids render with the default theme.
pub fn theme_or_default(id: &str) -> &'static Theme {
    find_theme(id).unwrap_or(&THEMES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let names = [
            ("default", "Default"),
            ("gruvbox", "Gruvbox"),
            ("tokyonight", "Tokyo Night"),
            ("catppuccin", "Catppuccin"),
            ("dracula", "Dracula"),
            ("nord", "Nord"),
        ];
        for (id, name) in names {
            assert_eq!(find_theme(id).map(|t| t.name), Some(name));
        }
        assert!(find_theme("nonexistent").is_none());
        assert_eq!(theme_or_default("nonexistent").id, "default");
    }

    #[test]
    fn colors_are_rgb() {
        for theme in &THEMES {
            for color in [
                theme.primary_accent,
                theme.secondary_accent,
                theme.correct_text,
                theme.error_text,
                theme.label_text,
                theme.remaining_text,
                theme.border,
                theme.selected_bg,
            ] {
                assert!(matches!(color, Color::Rgb(..)), "{} {color:?}", theme.id);
            }
        }
        assert_eq!(hex(0xe2b714), Color::Rgb(0xe2, 0xb7, 0x14));
    }
}
