//! Deterministic badge colors for people and projects.

use ratatui::style::Color;

pub const DEFAULT_ASSIGNER_COLOR: Color = Color::Rgb(0x2E, 0x29, 0x4E);

pub const ASSIGNER_COLORS: [Color; 8] = [
    Color::Rgb(0xE7, 0x4C, 0x3C),
    Color::Rgb(0x29, 0x80, 0xB9),
    Color::Rgb(0x27, 0xAE, 0x60),
    Color::Rgb(0x8E, 0x44, 0xAD),
    Color::Rgb(0xD3, 0x54, 0x00),
    Color::Rgb(0x16, 0xA0, 0x85),
    Color::Rgb(0x2C, 0x3E, 0x50),
    Color::Rgb(0x7D, 0x3C, 0x98),
];

pub const DEFAULT_PROJECT_COLOR: Color = Color::Rgb(0x9C, 0xA3, 0xAF);

pub const PROJECT_COLORS: [Color; 8] = [
    Color::Rgb(0x63, 0x66, 0xF1),
    Color::Rgb(0x8B, 0x5C, 0xF6),
    Color::Rgb(0xEC, 0x48, 0x99),
    Color::Rgb(0xF4, 0x3F, 0x5E),
    Color::Rgb(0xF5, 0x9E, 0x0B),
    Color::Rgb(0x10, 0xB9, 0x81),
    Color::Rgb(0x06, 0xB6, 0xD4),
    Color::Rgb(0x3B, 0x82, 0xF6),
];

/// 32-bit `h * 31 + c` string hash over UTF-16 code units, wrapping on overflow.
pub fn name_hash(name: &str) -> i32 {
    name.encode_utf16().fold(0i32, |hash, unit| {
        i32::from(unit).wrapping_add(hash.wrapping_shl(5).wrapping_sub(hash))
    })
}

pub fn assigner_color(name: Option<&str>) -> Color {
    match name.filter(|name| !name.is_empty()) {
        Some(name) => {
            let index = name_hash(name).unsigned_abs() as usize % ASSIGNER_COLORS.len();
            ASSIGNER_COLORS[index]
        }
        None => DEFAULT_ASSIGNER_COLOR,
    }
}

/// Color for a project badge: the numeric id modulo the palette size.
/// Missing, zero or non-numeric ids get the neutral color.
pub fn project_color(project_id: Option<&str>) -> Color {
    match project_id.and_then(|id| id.trim().parse::<i64>().ok()) {
        Some(id) if id != 0 => PROJECT_COLORS[id.rem_euclid(PROJECT_COLORS.len() as i64) as usize],
        _ => DEFAULT_PROJECT_COLOR,
    }
}

/// Uppercased first letter for avatar and badge glyphs.
pub fn initial(name: Option<&str>) -> String {
    name.and_then(|name| name.trim().chars().next())
        .map(|first| first.to_uppercase().collect())
        .unwrap_or_else(|| "?".to_owned())
}
