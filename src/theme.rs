//! Light and dark color themes.
//!
//! Views never pick raw colors; they receive the [`ThemeColors`] resolved from the
//! active [`Theme`] once per frame.

use crate::status::StatusClass;
use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Saved preference first, then the terminal's own hint, then light.
    pub fn resolve(saved: Option<Theme>) -> Theme {
        saved
            .or_else(|| std::env::var("COLORFGBG").ok().and_then(|hint| Self::from_colorfgbg(&hint)))
            .unwrap_or_default()
    }

    /// Reads `COLORFGBG` (`"fg;bg"` or `"fg;default;bg"`). Background indices 0-6 and 8
    /// are the dark half of the ANSI palette.
    pub fn from_colorfgbg(hint: &str) -> Option<Theme> {
        let background: u8 = hint.rsplit(';').next()?.trim().parse().ok()?;
        Some(match background {
            0..=6 | 8 => Theme::Dark,
            _ => Theme::Light,
        })
    }

    pub fn toggled(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Light => ThemeColors::light(),
            Theme::Dark => ThemeColors::dark(),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
        }
    }
}

/// Semantic color roles for one theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub bg: Color,
    pub surface: Color,
    pub text: Color,
    pub muted: Color,
    pub primary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub border: Color,
    pub border_focused: Color,
    pub selection_bg: Color,
    pub badge_text: Color,
}

impl ThemeColors {
    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(249, 250, 251),
            surface: Color::Rgb(255, 255, 255),
            text: Color::Rgb(17, 24, 39),
            muted: Color::Rgb(107, 114, 128),
            primary: Color::Rgb(79, 70, 229),
            success: Color::Rgb(22, 163, 74),
            warning: Color::Rgb(217, 119, 6),
            error: Color::Rgb(220, 38, 38),
            border: Color::Rgb(209, 213, 219),
            border_focused: Color::Rgb(79, 70, 229),
            selection_bg: Color::Rgb(224, 231, 255),
            badge_text: Color::Rgb(255, 255, 255),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(17, 24, 39),
            surface: Color::Rgb(31, 41, 55),
            text: Color::Rgb(243, 244, 246),
            muted: Color::Rgb(156, 163, 175),
            primary: Color::Rgb(129, 140, 248),
            success: Color::Rgb(74, 222, 128),
            warning: Color::Rgb(251, 191, 36),
            error: Color::Rgb(248, 113, 113),
            border: Color::Rgb(75, 85, 99),
            border_focused: Color::Rgb(129, 140, 248),
            selection_bg: Color::Rgb(55, 65, 81),
            badge_text: Color::Rgb(255, 255, 255),
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.bg)
    }

    pub fn header(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }

    pub fn selected(&self) -> Style {
        Style::default().bg(self.selection_bg).add_modifier(Modifier::BOLD)
    }

    pub fn border(&self, focused: bool) -> Style {
        Style::default().fg(if focused { self.border_focused } else { self.border })
    }

    pub fn status_color(&self, class: &StatusClass) -> Color {
        match class {
            StatusClass::Draft => self.muted,
            StatusClass::New => self.primary,
            StatusClass::InProgress => self.warning,
            StatusClass::Completed => self.success,
            StatusClass::OnHold => self.error,
            StatusClass::Other(_) => self.muted,
        }
    }

    pub fn status_badge(&self, class: &StatusClass) -> Style {
        Style::default()
            .fg(self.badge_text)
            .bg(self.status_color(class))
    }
}

impl Default for ThemeColors {
    fn default() -> Self {
        Theme::default().colors()
    }
}
