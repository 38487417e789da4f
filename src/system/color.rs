//! Color Classification
//!
//! Maps a raw 3-channel color sample onto the closed palette of floor and
//! sticker colors the courier reacts to.
//!
//! # Method
//! - Nearest reference vector by Euclidean distance
//! - Reference table calibrated for the sensor mounted at driving height
//! - Ties resolve to the entry declared first in [`REFERENCE_COLORS`]
//!
//! # Degenerate input
//! A sample that is missing, does not have exactly three channels, contains
//! a non-finite value, or is all zero (no light returned) classifies as
//! [`ColorLabel::Unknown`]. Unknown is "no event", never an error.

/// Color labels recognised by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ColorLabel {
    /// Junction marker on the boundary line
    Black,
    /// Plain floor
    White,
    /// Restricted-room sticker
    Red,
    /// Recipient sticker inside a room
    Green,
    /// Mail-room tile as reported by sensors with a native blue channel
    Blue,
    /// Mail-room tile as seen through the calibrated reference table
    Purple,
    /// Office tile
    Yellow,
    /// Doorway strip
    Orange,
    /// No usable reading
    Unknown,
}

impl ColorLabel {
    /// Whether this label marks the mail-room tile
    pub fn is_mail_room(self) -> bool {
        matches!(self, ColorLabel::Blue | ColorLabel::Purple)
    }

    /// The calibrated reference sample for this label, if it has one
    pub fn reference_sample(self) -> Option<ColorSample> {
        REFERENCE_COLORS
            .iter()
            .find(|(label, _)| *label == self)
            .map(|(_, rgb)| ColorSample::new(rgb[0], rgb[1], rgb[2]))
    }
}

/// Raw color reading from the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ColorSample {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

impl ColorSample {
    pub const fn new(red: f32, green: f32, blue: f32) -> Self {
        Self { red, green, blue }
    }

    /// Channels in red, green, blue order
    pub fn channels(&self) -> [f32; 3] {
        [self.red, self.green, self.blue]
    }

    /// Classify this sample against the reference table
    pub fn classify(&self) -> ColorLabel {
        detect_color(&self.channels())
    }
}

/// Calibrated reference colors, in tie-break order
pub const REFERENCE_COLORS: [(ColorLabel, [f32; 3]); 7] = [
    (ColorLabel::Black, [8.53, 9.47, 3.47]),
    (ColorLabel::Green, [125.60, 177.80, 14.93]),
    (ColorLabel::Orange, [214.40, 75.67, 13.60]),
    (ColorLabel::Purple, [90.87, 48.13, 42.20]),
    (ColorLabel::Red, [161.33, 17.47, 7.93]),
    (ColorLabel::White, [250.00, 242.40, 108.80]),
    (ColorLabel::Yellow, [277.53, 237.00, 22.20]),
];

/// Euclidean distance between two RGB vectors
fn color_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dr = a[0] - b[0];
    let dg = a[1] - b[1];
    let db = a[2] - b[2];
    libm::sqrtf(dr * dr + dg * dg + db * db)
}

/// Classifies raw channels to the nearest reference color
///
/// Accepts any slice so that malformed samples (wrong channel count) can be
/// passed straight through from a driver and still classify safely.
pub fn detect_color(channels: &[f32]) -> ColorLabel {
    let sample: [f32; 3] = match channels.try_into() {
        Ok(sample) => sample,
        Err(_) => return ColorLabel::Unknown,
    };

    if sample.iter().any(|c| !c.is_finite()) || sample.iter().all(|c| *c == 0.0) {
        return ColorLabel::Unknown;
    }

    nearest(&sample, &REFERENCE_COLORS)
}

/// Nearest entry of `table`; the first of several equal minima wins
fn nearest(sample: &[f32; 3], table: &[(ColorLabel, [f32; 3])]) -> ColorLabel {
    let mut best = ColorLabel::Unknown;
    let mut best_distance = f32::INFINITY;
    for (label, reference) in table.iter() {
        let distance = color_distance(sample, reference);
        if distance < best_distance {
            best = *label;
            best_distance = distance;
        }
    }
    best
}
