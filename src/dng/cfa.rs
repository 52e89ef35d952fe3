//! Color filter array resolution and illuminant codes.

use crate::error::VfsError;

/// A 2×2 Bayer pattern of channel indices (R=0, G=1, B=2), row-major.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CfaPattern(pub [u8; 4]);

impl CfaPattern {
    /// Resolve a sensor arrangement string to its pattern.
    ///
    /// Anything outside the four known arrangements fails the whole
    /// pipeline with an invalid-format error.
    pub fn from_sensor_arrangement(arrangement: &str) -> Result<Self, VfsError> {
        match arrangement {
            "rggb" => Ok(CfaPattern([0, 1, 1, 2])),
            "bggr" => Ok(CfaPattern([2, 1, 1, 0])),
            "grbg" => Ok(CfaPattern([1, 0, 2, 1])),
            "gbrg" => Ok(CfaPattern([1, 2, 0, 1])),
            other => Err(VfsError::InvalidFormat(format!(
                "unsupported sensor arrangement: {other:?}"
            ))),
        }
    }

    /// Channel at Bayer position `i` (0..4, row-major within the 2×2 block).
    #[inline]
    pub fn channel(&self, i: usize) -> u8 {
        self.0[i]
    }
}

/// Map a calibration illuminant name to its DNG illuminant code.
///
/// Unknown names map to 0 (unknown illuminant).
pub fn illuminant_code(name: &str) -> u16 {
    match name {
        "standarda" => 17,
        "standardb" => 18,
        "standardc" => 19,
        "d55" => 20,
        "d65" => 21,
        "d75" => 22,
        "d50" => 23,
        _ => 0,
    }
}
