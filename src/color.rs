use ratatui::style::Color;
use serde::{Deserialize, Serialize};

use crate::config::Difficulty;

/// An ink color a stimulus can be rendered in. The ten entries are ordered by
/// the difficulty at which they first become available, so a palette is always
/// a prefix of [`InkColor::ALL`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InkColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Pink,
    Brown,
    Gray,
    Black,
}

impl InkColor {
    pub const ALL: [InkColor; 10] = [
        InkColor::Red,
        InkColor::Blue,
        InkColor::Green,
        InkColor::Yellow,
        InkColor::Purple,
        InkColor::Orange,
        InkColor::Pink,
        InkColor::Brown,
        InkColor::Gray,
        InkColor::Black,
    ];

    /// Canonical uppercase name, the form answers are normalized against.
    pub fn name(&self) -> &'static str {
        match self {
            InkColor::Red => "RED",
            InkColor::Blue => "BLUE",
            InkColor::Green => "GREEN",
            InkColor::Yellow => "YELLOW",
            InkColor::Purple => "PURPLE",
            InkColor::Orange => "ORANGE",
            InkColor::Pink => "PINK",
            InkColor::Brown => "BROWN",
            InkColor::Gray => "GRAY",
            InkColor::Black => "BLACK",
        }
    }

    pub fn hex(&self) -> &'static str {
        match self {
            InkColor::Red => "#e53e3e",
            InkColor::Blue => "#3182ce",
            InkColor::Green => "#38a169",
            InkColor::Yellow => "#d69e2e",
            InkColor::Purple => "#805ad5",
            InkColor::Orange => "#dd6b20",
            InkColor::Pink => "#d53f8c",
            InkColor::Brown => "#a0522d",
            InkColor::Gray => "#718096",
            InkColor::Black => "#2d3748",
        }
    }

    /// Terminal color used when rendering the stimulus.
    pub fn terminal(&self) -> Color {
        let hex = self.hex().trim_start_matches('#');
        let r = u8::from_str_radix(&hex[0..2], 16).unwrap_or(0);
        let g = u8::from_str_radix(&hex[2..4], 16).unwrap_or(0);
        let b = u8::from_str_radix(&hex[4..6], 16).unwrap_or(0);
        Color::Rgb(r, g, b)
    }
}

/// Difficulty-bounded color palette: Easy 4, Medium 6, Hard 8, Expert 10.
pub fn palette(difficulty: Difficulty) -> &'static [InkColor] {
    &InkColor::ALL[..difficulty.palette_size()]
}
