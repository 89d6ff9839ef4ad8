//! Cell formatting decisions for the destination sheet.
//!
//! Colors use the Sheets convention of 0.0..=1.0 channels.

use crate::types::RankChange;
use serde::{Deserialize, Serialize};

/// Rank-change column (G).
pub const RANK_CHANGE_COLUMN: usize = 6;
/// Background band covers columns A..I.
pub const BAND_COLUMNS: std::ops::Range<usize> = 0..9;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Rgb {
    #[serde(default)]
    pub red: f64,
    #[serde(default)]
    pub green: f64,
    #[serde(default)]
    pub blue: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl Rgb {
    pub const fn new(red: f64, green: f64, blue: f64) -> Self {
        Self { red, green, blue, alpha: None }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(f64::from(r) / 255.0, f64::from(g) / 255.0, f64::from(b) / 255.0)
    }

    fn channels_within(&self, lo: f64, hi: f64) -> bool {
        [self.red, self.green, self.blue]
            .iter()
            .all(|c| (lo..=hi).contains(c))
    }
}

pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);
pub const BLUE: Rgb = Rgb::new(0.0, 0.0, 1.0);
pub const BLACK: Rgb = Rgb::new(0.0, 0.0, 0.0);

/// Band tone applied to alternating blocks, RGB(230, 230, 230).
pub fn band_color() -> Rgb {
    Rgb::from_u8(230, 230, 230)
}

/// RGB(217, 217, 217), recognized but never applied by us.
pub fn is_light_gray1(color: &Rgb) -> bool {
    color.channels_within(0.84, 0.86)
}

/// The band tone.
pub fn is_light_gray2(color: &Rgb) -> bool {
    color.channels_within(0.89, 0.91)
}

/// Absent channels in the Sheets API mean 0.0, so a stored white still
/// reports all three; a zero alpha means transparent.
pub fn is_white_or_transparent(color: &Rgb) -> bool {
    if color.alpha == Some(0.0) {
        return true;
    }
    color.red >= 0.99 && color.green >= 0.99 && color.blue >= 0.99
}

/// Background applied to a freshly appended block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandDecision {
    /// Light band, previous block was plain.
    Band,
    /// Explicit white.
    Plain,
}

impl BandDecision {
    pub fn color(self) -> Rgb {
        match self {
            BandDecision::Band => band_color(),
            BandDecision::Plain => WHITE,
        }
    }
}

/// Decide the background of the new block from the row just above it.
///
/// `None` for `previous` means that row has no explicit background.
pub fn decide_band(previous: Option<&Rgb>) -> BandDecision {
    match previous {
        None => BandDecision::Band,
        Some(c) if is_light_gray2(c) => BandDecision::Plain,
        Some(c) if is_white_or_transparent(c) || is_light_gray1(c) => BandDecision::Band,
        Some(_) => BandDecision::Plain,
    }
}

/// Foreground for the rank-change cell.
pub fn rank_change_color(change: &RankChange) -> Rgb {
    match change {
        RankChange::New | RankChange::Up(_) => RED,
        RankChange::Down(_) => BLUE,
        RankChange::Unchanged => BLACK,
    }
}

/// Store-agnostic formatting instruction; row indices are 0-based, end-exclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatRequest {
    TextColor {
        row: usize,
        column: usize,
        color: Rgb,
    },
    Background {
        start_row: usize,
        end_row: usize,
        columns: std::ops::Range<usize>,
        color: Rgb,
    },
}
