//! Render options applied when materializing frames.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Bitset of per-mount rendering options.
///
/// Options affect how every frame in the mount is rendered; changing them
/// through `update_options` rebuilds the entry list because the typical DNG
/// size changes with them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions(u32);

impl RenderOptions {
    pub const NONE: RenderOptions = RenderOptions(0);
    /// Spatially downscale frames by the mount's draft scale.
    pub const DRAFT: RenderOptions = RenderOptions(1 << 0);
    /// Apply the per-frame lens shading map to correct vignetting.
    pub const APPLY_VIGNETTE: RenderOptions = RenderOptions(1 << 1);
    /// Normalize the shading map by its global maximum before applying.
    pub const NORMALIZE_SHADING: RenderOptions = RenderOptions(1 << 2);

    /// True if every flag in `other` is set in `self`.
    pub fn contains(self, other: RenderOptions) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    /// Rebuild from raw bits, ignoring unknown flags.
    pub fn from_bits(bits: u32) -> Self {
        RenderOptions(bits & 0b111)
    }
}

impl BitOr for RenderOptions {
    type Output = RenderOptions;

    fn bitor(self, rhs: Self) -> Self {
        RenderOptions(self.0 | rhs.0)
    }
}

impl BitOrAssign for RenderOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for RenderOptions {
    type Output = RenderOptions;

    fn bitand(self, rhs: Self) -> Self {
        RenderOptions(self.0 & rhs.0)
    }
}

impl fmt::Display for RenderOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }

        let mut flags = Vec::new();
        if self.contains(RenderOptions::DRAFT) {
            flags.push("DRAFT");
        }
        if self.contains(RenderOptions::APPLY_VIGNETTE) {
            flags.push("APPLY_VIGNETTE");
        }
        if self.contains(RenderOptions::NORMALIZE_SHADING) {
            flags.push("NORMALIZE_SHADING");
        }
        write!(f, "{}", flags.join(" | "))
    }
}

/// The spatial downscale in effect for a mount: the draft scale when DRAFT
/// is set, otherwise 1.
pub fn effective_scale(options: RenderOptions, draft_scale: u32) -> u32 {
    if options.contains(RenderOptions::DRAFT) {
        draft_scale
    } else {
        1
    }
}
