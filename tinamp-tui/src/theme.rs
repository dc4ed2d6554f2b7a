//! Retro player skins for Tinamp

use ratatui::style::{Color, Modifier, Style};

/// Theme configuration for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,
    /// Primary foreground color (text, borders)
    pub fg: Color,
    /// Dimmed foreground (secondary text)
    pub fg_dim: Color,
    /// Background color
    pub bg: Color,
    /// Highlight color (selected items, active elements)
    pub highlight: Color,
    /// LCD readout color (title, time)
    pub lcd: Color,
    /// Accent color (meters, spectrum bars)
    pub accent: Color,
    pub warning: Color,
    pub danger: Color,
    /// Retro mode tag and beat lamp
    pub retro: Color,
}

impl Theme {
    pub fn normal(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    pub fn dim(&self) -> Style {
        Style::default().fg(self.fg_dim).bg(self.bg)
    }

    /// Selected rows and pressed toggles
    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.bg)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border(&self) -> Style {
        Style::default().fg(self.fg_dim)
    }

    pub fn border_active(&self) -> Style {
        Style::default().fg(self.highlight)
    }

    pub fn title(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    /// LCD-style readout text
    pub fn lcd(&self) -> Style {
        Style::default().fg(self.lcd).add_modifier(Modifier::BOLD)
    }

    pub fn retro_tag(&self) -> Style {
        Style::default().fg(self.retro).add_modifier(Modifier::BOLD)
    }

    /// Meter color for a level in 0.0..=1.0
    pub fn meter_style(&self, level: f32) -> Style {
        let color = if level > 0.9 {
            self.danger
        } else if level > 0.7 {
            self.warning
        } else {
            self.accent
        };
        Style::default().fg(color)
    }

    /// Boost above zero, cut below
    pub fn gain_style(&self, gain_db: f32) -> Style {
        let color = if gain_db > 0.0 {
            self.accent
        } else if gain_db < 0.0 {
            self.warning
        } else {
            self.fg_dim
        };
        Style::default().fg(color)
    }

    /// Toggle indicator, lit when `on`
    pub fn toggle(&self, on: bool) -> Style {
        if on {
            self.highlight()
        } else {
            Style::default().fg(self.fg_dim)
        }
    }
}

/// Classic green-on-black LCD skin
pub const CLASSIC: Theme = Theme {
    name: "classic",
    fg: Color::Rgb(200, 210, 220),
    fg_dim: Color::Rgb(90, 100, 120),
    bg: Color::Rgb(10, 15, 26),         // #0a0f1a - visualizer background
    highlight: Color::Rgb(79, 209, 199), // #4fd1c7
    lcd: Color::Rgb(0, 255, 65),        // #00ff41
    accent: Color::Rgb(0, 204, 51),
    warning: Color::Rgb(255, 255, 0),
    danger: Color::Rgb(255, 68, 68),
    retro: Color::Rgb(255, 140, 0),     // #ff8c00
};

/// Amber CRT skin
pub const AMBER: Theme = Theme {
    name: "amber",
    fg: Color::Rgb(255, 176, 0),
    fg_dim: Color::Rgb(128, 88, 0),
    bg: Color::Rgb(10, 5, 0),
    highlight: Color::Rgb(255, 220, 128),
    lcd: Color::Rgb(255, 200, 64),
    accent: Color::Rgb(255, 200, 64),
    warning: Color::Rgb(255, 255, 100),
    danger: Color::Rgb(255, 100, 100),
    retro: Color::Rgb(255, 120, 40),
};

impl Theme {
    pub fn by_name(name: &str) -> Option<Theme> {
        match name.trim().to_lowercase().as_str() {
            "classic" | "green" => Some(CLASSIC),
            "amber" => Some(AMBER),
            _ => None,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        CLASSIC
    }
}
