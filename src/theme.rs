//! Theme data model: the two built-in palettes and resolution from config.

use ratatui::style::Color;

/// All runtime colors used in the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeColors {
    // Header
    pub header_fg: Color,
    pub header_path_fg: Color,

    // Panels
    pub border_fg: Color,
    pub border_focused_fg: Color,

    // Tree
    pub tree_selected_bg: Color,
    pub tree_selected_fg: Color,
    pub tree_dir_fg: Color,
    pub tree_file_fg: Color,
    pub tree_indicator_fg: Color,

    // Status bar
    pub status_bg: Color,
    pub status_fg: Color,
    pub status_key_fg: Color,

    // Semantic
    pub accent_fg: Color,
    pub muted_fg: Color,
    pub subtle_fg: Color,
    pub error_fg: Color,
    pub help_bg: Color,
}

/// Muted editorial palette for dark terminals.
pub fn dark_theme() -> ThemeColors {
    ThemeColors {
        header_fg: Color::Rgb(224, 224, 224),      // #e0e0e0
        header_path_fg: Color::Rgb(136, 136, 136), // #888888

        border_fg: Color::Rgb(58, 58, 58),           // #3a3a3a
        border_focused_fg: Color::Rgb(126, 179, 142), // #7eb38e

        tree_selected_bg: Color::Rgb(51, 51, 51), // #333333
        tree_selected_fg: Color::Rgb(224, 224, 224),
        tree_dir_fg: Color::Rgb(126, 179, 142),
        tree_file_fg: Color::Rgb(224, 224, 224),
        tree_indicator_fg: Color::Rgb(92, 92, 92), // #5c5c5c

        status_bg: Color::Rgb(26, 26, 26), // #1a1a1a
        status_fg: Color::Rgb(136, 136, 136),
        status_key_fg: Color::Rgb(126, 179, 142),

        accent_fg: Color::Rgb(126, 179, 142),
        muted_fg: Color::Rgb(136, 136, 136),
        subtle_fg: Color::Rgb(92, 92, 92),
        error_fg: Color::Rgb(255, 107, 107), // #ff6b6b
        help_bg: Color::Rgb(26, 26, 26),
    }
}

/// The same palette tuned for light terminals.
pub fn light_theme() -> ThemeColors {
    ThemeColors {
        header_fg: Color::Rgb(45, 45, 45),         // #2d2d2d
        header_path_fg: Color::Rgb(102, 102, 102), // #666666

        border_fg: Color::Rgb(221, 221, 221),       // #dddddd
        border_focused_fg: Color::Rgb(74, 124, 89), // #4a7c59

        tree_selected_bg: Color::Rgb(238, 238, 238), // #eeeeee
        tree_selected_fg: Color::Rgb(45, 45, 45),
        tree_dir_fg: Color::Rgb(74, 124, 89),
        tree_file_fg: Color::Rgb(45, 45, 45),
        tree_indicator_fg: Color::Rgb(155, 155, 155), // #9b9b9b

        status_bg: Color::Rgb(245, 245, 245), // #f5f5f5
        status_fg: Color::Rgb(102, 102, 102),
        status_key_fg: Color::Rgb(74, 124, 89),

        accent_fg: Color::Rgb(74, 124, 89),
        muted_fg: Color::Rgb(102, 102, 102),
        subtle_fg: Color::Rgb(155, 155, 155),
        error_fg: Color::Rgb(204, 51, 51), // #cc3333
        help_bg: Color::Rgb(245, 245, 245),
    }
}

/// Pick the palette for a scheme name. Unknown names get the dark palette.
pub fn resolve_theme(scheme: &str) -> ThemeColors {
    match scheme {
        "light" => light_theme(),
        _ => dark_theme(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_dark_theme() {
        assert_eq!(resolve_theme("dark"), dark_theme());
    }

    #[test]
    fn resolve_light_theme() {
        let theme = resolve_theme("light");
        assert_eq!(theme.tree_dir_fg, Color::Rgb(74, 124, 89));
    }

    #[test]
    fn unknown_scheme_falls_back_to_dark() {
        assert_eq!(resolve_theme("neon"), dark_theme());
    }

    #[test]
    fn dark_and_light_differ() {
        let dark = dark_theme();
        let light = light_theme();
        assert_ne!(dark.header_fg, light.header_fg);
        assert_ne!(dark.tree_selected_bg, light.tree_selected_bg);
        assert_ne!(dark.status_bg, light.status_bg);
    }
}
