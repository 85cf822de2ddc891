//! Musical scales and keys, and quantization of raw semitone offsets onto
//! them. The mapper produces continuous pitch offsets from steering and
//! braking; snapping them to a scale keeps the result musical instead of
//! chromatic sliding.

use serde::{Deserialize, Serialize};

/// The scales the mapper can quantize to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Scale {
    #[default]
    Pentatonic,
    Major,
    Minor,
    Blues,
    Dorian,
}

impl Scale {
    /// The scale's degrees as semitones above the tonic, within one octave.
    pub fn degrees(&self) -> &'static [i32] {
        match self {
            Scale::Pentatonic => &[0, 2, 4, 7, 9],
            Scale::Major => &[0, 2, 4, 5, 7, 9, 11],
            Scale::Minor => &[0, 2, 3, 5, 7, 8, 10],
            Scale::Blues => &[0, 3, 5, 6, 7, 10],
            Scale::Dorian => &[0, 2, 3, 5, 7, 9, 10],
        }
    }
}

/// The twelve keys. Enharmonic spellings collapse to the sharp names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum Key {
    #[default]
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl Key {
    /// Semitones above C.
    pub fn offset(&self) -> i32 {
        match self {
            Key::C => 0,
            Key::Cs => 1,
            Key::D => 2,
            Key::Ds => 3,
            Key::E => 4,
            Key::F => 5,
            Key::Fs => 6,
            Key::G => 7,
            Key::Gs => 8,
            Key::A => 9,
            Key::As => 10,
            Key::B => 11,
        }
    }
}

/// Snap a semitone offset to the nearest degree of `scale` in `key`,
/// preserving the octave. The result is again an offset relative to the
/// caller's base pitch.
pub fn quantize(offset: f32, scale: Scale, key: Key) -> f32 {
    let degrees = scale.degrees();
    let total = offset + key.offset() as f32;

    let octave = (total / 12.0).floor();
    let within = total - octave * 12.0;

    // Nearest degree, considering the tonic of the next octave too so
    // e.g. 11.4 in pentatonic snaps up to 12, not down to 9.
    let mut best = degrees[0] as f32;
    let mut best_dist = (within - best).abs();
    for &d in degrees.iter().skip(1).chain(&[12]) {
        let dist = (within - d as f32).abs();
        if dist < best_dist {
            best = d as f32;
            best_dist = dist;
        }
    }

    octave * 12.0 + best - key.offset() as f32
}
