//! Container and per-frame metadata parsing.
//!
//! Metadata documents are lenient JSON: any field may be missing and must
//! fall back to a documented default (zero, empty string, identity matrix,
//! unity neutral) instead of failing the parse. Unknown fields are ignored.

use serde::Deserialize;

use crate::error::VfsError;

const IDENTITY_3X3: [f32; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Container-level calibration metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfiguration {
    /// Per-position black level, Bayer order.
    pub black_level: [f32; 4],
    pub white_level: f32,
    /// Sensor CFA arrangement: "rggb", "bggr", "grbg" or "gbrg".
    #[serde(alias = "sensorArrangment")]
    pub sensor_arrangement: String,
    pub color_matrix1: [f32; 9],
    pub color_matrix2: [f32; 9],
    pub forward_matrix1: [f32; 9],
    pub forward_matrix2: [f32; 9],
    pub calibration_matrix1: [f32; 9],
    pub calibration_matrix2: [f32; 9],
    /// Illuminant names for the two calibration sets, e.g. "standarda", "d65".
    pub color_illuminant1: String,
    pub color_illuminant2: String,
    pub device_specific_profile: DeviceSpecificProfile,
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            black_level: [0.0; 4],
            white_level: 0.0,
            sensor_arrangement: String::new(),
            color_matrix1: IDENTITY_3X3,
            color_matrix2: IDENTITY_3X3,
            forward_matrix1: IDENTITY_3X3,
            forward_matrix2: IDENTITY_3X3,
            calibration_matrix1: IDENTITY_3X3,
            calibration_matrix2: IDENTITY_3X3,
            color_illuminant1: String::new(),
            color_illuminant2: String::new(),
            device_specific_profile: DeviceSpecificProfile::default(),
        }
    }
}

/// Device identity carried by the container; the device model becomes the
/// DNG `UniqueCameraModel` unless a per-mount override is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeviceSpecificProfile {
    pub camera_id: String,
    pub device_model: String,
    pub disable_shading_map: bool,
}

/// Per-frame metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrameMetadata {
    /// Active (cropped) frame dimensions.
    pub width: u32,
    pub height: u32,
    /// Full sensor dimensions the shading map is defined over.
    pub original_width: u32,
    pub original_height: u32,
    pub iso: u32,
    /// Exposure time in nanoseconds.
    pub exposure_time: f64,
    pub as_shot_neutral: [f32; 3],
    pub dynamic_black_level: [f32; 4],
    pub dynamic_white_level: f32,
    /// Per-channel shading gain rows, `lens_shading_map_width ×
    /// lens_shading_map_height` values each.
    pub lens_shading_map: Vec<Vec<f32>>,
    pub lens_shading_map_width: u32,
    pub lens_shading_map_height: u32,
    pub orientation: u32,
}

impl Default for FrameMetadata {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            original_width: 0,
            original_height: 0,
            iso: 0,
            exposure_time: 0.0,
            as_shot_neutral: [1.0, 1.0, 1.0],
            dynamic_black_level: [0.0; 4],
            dynamic_white_level: 0.0,
            lens_shading_map: Vec::new(),
            lens_shading_map_width: 0,
            lens_shading_map_height: 0,
            orientation: 0,
        }
    }
}

impl CameraConfiguration {
    /// Parse from a container metadata document.
    pub fn parse(value: &serde_json::Value) -> Result<Self, VfsError> {
        serde_json::from_value(value.clone())
            .map_err(|e| VfsError::InvalidFormat(format!("container metadata: {e}")))
    }
}

impl FrameMetadata {
    /// Parse from a frame metadata document.
    pub fn parse(value: &serde_json::Value) -> Result<Self, VfsError> {
        serde_json::from_value(value.clone())
            .map_err(|e| VfsError::InvalidFormat(format!("frame metadata: {e}")))
    }
}
