//! Typed uniform block of the wireframe material.
//!
//! External callers address uniforms by string key (GUI panels, JSON
//! configs). Keys are resolved through a fixed table into [`UniformField`]s;
//! unknown keys and values of the wrong shape are skipped with a log entry
//! instead of failing the whole update.

use std::collections::BTreeMap;

use barywire_base::Color;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Byte size of the packed uniform block, matching the WGSL struct.
pub const UNIFORM_BLOCK_SIZE: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Color(Color),
}

impl UniformValue {
    pub fn kind(&self) -> &'static str {
        match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Color(_) => "color",
        }
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<[f32; 2]> for UniformValue {
    fn from(v: [f32; 2]) -> Self {
        UniformValue::Vec2(v)
    }
}

impl From<[f32; 3]> for UniformValue {
    fn from(v: [f32; 3]) -> Self {
        UniformValue::Vec3(v)
    }
}

impl From<Color> for UniformValue {
    fn from(v: Color) -> Self {
        UniformValue::Color(v)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformField {
    Fill,
    Stroke,
    DualStroke,
    InsideColor,
    Thickness,
    SecondThickness,
    DashRepeats,
    DashLength,
    DashOffset,
    NoiseAIntensity,
    NoiseBIntensity,
    NoiseScale,
    SqueezeMin,
    SqueezeMax,
    DepthFadeNear,
    DepthFadeFar,
    Time,
    CameraPosition,
    Resolution,
}

const UNIFORM_KEYS: &[(&str, UniformField)] = &[
    ("fill", UniformField::Fill),
    ("stroke", UniformField::Stroke),
    ("dualStroke", UniformField::DualStroke),
    ("insideColor", UniformField::InsideColor),
    ("insideAltColor", UniformField::InsideColor),
    ("thickness", UniformField::Thickness),
    ("secondThickness", UniformField::SecondThickness),
    ("dashRepeats", UniformField::DashRepeats),
    ("dashLength", UniformField::DashLength),
    ("dashOffset", UniformField::DashOffset),
    ("noiseAIntensity", UniformField::NoiseAIntensity),
    ("noiseBIntensity", UniformField::NoiseBIntensity),
    ("noiseScale", UniformField::NoiseScale),
    ("squeezeMin", UniformField::SqueezeMin),
    ("squeezeMax", UniformField::SqueezeMax),
    ("depthFadeNear", UniformField::DepthFadeNear),
    ("depthFadeFar", UniformField::DepthFadeFar),
    ("time", UniformField::Time),
    ("cameraPosition", UniformField::CameraPosition),
    ("resolution", UniformField::Resolution),
];

impl UniformField {
    pub fn from_key(key: &str) -> Option<Self> {
        UNIFORM_KEYS
            .iter()
            .find(|(name, _)| *name == key)
            .map(|(_, field)| *field)
    }

    pub fn keys() -> impl Iterator<Item = &'static str> {
        UNIFORM_KEYS.iter().map(|(name, _)| *name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WireframeUniforms {
    pub fill: Color,
    pub stroke: Color,
    pub dual_stroke: Color,
    pub inside_color: Color,
    pub thickness: f32,
    pub second_thickness: f32,
    pub dash_repeats: f32,
    pub dash_length: f32,
    pub dash_offset: f32,
    pub noise_a_intensity: f32,
    pub noise_b_intensity: f32,
    pub noise_scale: f32,
    pub squeeze_min: f32,
    pub squeeze_max: f32,
    pub depth_fade_near: f32,
    pub depth_fade_far: f32,
    pub time: f32,
    pub camera_position: [f32; 3],
    pub resolution: [f32; 2],
}

impl Default for WireframeUniforms {
    fn default() -> Self {
        Self {
            fill: Color::rgb(0.07, 0.07, 0.07),
            stroke: Color::WHITE,
            dual_stroke: Color::rgb(1.0, 0.2, 0.4),
            inside_color: Color::rgb(0.2, 0.4, 1.0),
            thickness: 0.02,
            second_thickness: 0.05,
            dash_repeats: 2.0,
            dash_length: 0.55,
            dash_offset: 0.0,
            noise_a_intensity: 0.15,
            noise_b_intensity: 0.5,
            noise_scale: 1.0,
            squeeze_min: 0.1,
            squeeze_max: 1.0,
            depth_fade_near: 1.0,
            depth_fade_far: 10.0,
            time: 0.0,
            camera_position: [0.0, 0.0, 5.0],
            resolution: [1280.0, 720.0],
        }
    }
}

impl WireframeUniforms {
    /// Stores `value` into `field`. Returns `false` when the value has the
    /// wrong shape; the block is left untouched in that case.
    pub fn set(&mut self, field: UniformField, value: UniformValue) -> bool {
        use UniformField as F;
        if let Some(slot) = self.color_slot(field) {
            *slot = match value {
                UniformValue::Color(color) => color,
                UniformValue::Vec3(rgb) => Color::from(rgb),
                _ => return false,
            };
            return true;
        }
        match (field, value) {
            (F::CameraPosition, UniformValue::Vec3(position)) => self.camera_position = position,
            (F::Resolution, UniformValue::Vec2(size)) => self.resolution = size,
            (F::CameraPosition | F::Resolution, _) => return false,
            (scalar, UniformValue::Float(value)) => match self.scalar_slot(scalar) {
                Some(slot) => *slot = value,
                None => return false,
            },
            _ => return false,
        }
        true
    }

    pub fn get(&self, field: UniformField) -> UniformValue {
        use UniformField as F;
        match field {
            F::Fill => self.fill.into(),
            F::Stroke => self.stroke.into(),
            F::DualStroke => self.dual_stroke.into(),
            F::InsideColor => self.inside_color.into(),
            F::Thickness => self.thickness.into(),
            F::SecondThickness => self.second_thickness.into(),
            F::DashRepeats => self.dash_repeats.into(),
            F::DashLength => self.dash_length.into(),
            F::DashOffset => self.dash_offset.into(),
            F::NoiseAIntensity => self.noise_a_intensity.into(),
            F::NoiseBIntensity => self.noise_b_intensity.into(),
            F::NoiseScale => self.noise_scale.into(),
            F::SqueezeMin => self.squeeze_min.into(),
            F::SqueezeMax => self.squeeze_max.into(),
            F::DepthFadeNear => self.depth_fade_near.into(),
            F::DepthFadeFar => self.depth_fade_far.into(),
            F::Time => self.time.into(),
            F::CameraPosition => self.camera_position.into(),
            F::Resolution => self.resolution.into(),
        }
    }

    /// Applies keyed values and returns how many were stored.
    pub fn apply(&mut self, values: &UniformValues) -> usize {
        let mut applied = 0;
        for (key, value) in values.iter() {
            let Some(field) = UniformField::from_key(key) else {
                debug!(key, "ignoring unknown uniform");
                continue;
            };
            if self.set(field, *value) {
                applied += 1;
            } else {
                warn!(key, kind = value.kind(), "uniform value has the wrong type");
            }
        }
        applied
    }

    fn color_slot(&mut self, field: UniformField) -> Option<&mut Color> {
        use UniformField as F;
        let slot = match field {
            F::Fill => &mut self.fill,
            F::Stroke => &mut self.stroke,
            F::DualStroke => &mut self.dual_stroke,
            F::InsideColor => &mut self.inside_color,
            _ => return None,
        };
        Some(slot)
    }

    fn scalar_slot(&mut self, field: UniformField) -> Option<&mut f32> {
        use UniformField as F;
        let slot = match field {
            F::Thickness => &mut self.thickness,
            F::SecondThickness => &mut self.second_thickness,
            F::DashRepeats => &mut self.dash_repeats,
            F::DashLength => &mut self.dash_length,
            F::DashOffset => &mut self.dash_offset,
            F::NoiseAIntensity => &mut self.noise_a_intensity,
            F::NoiseBIntensity => &mut self.noise_b_intensity,
            F::NoiseScale => &mut self.noise_scale,
            F::SqueezeMin => &mut self.squeeze_min,
            F::SqueezeMax => &mut self.squeeze_max,
            F::DepthFadeNear => &mut self.depth_fade_near,
            F::DepthFadeFar => &mut self.depth_fade_far,
            F::Time => &mut self.time,
            _ => return None,
        };
        Some(slot)
    }

    /// Packs the block in the layout of the WGSL `WireframeUniforms` struct:
    /// each vec3 shares its 16-byte slot with a trailing scalar.
    pub fn to_bytes(&self) -> Vec<u8> {
        let words: [f32; UNIFORM_BLOCK_SIZE / 4] = [
            self.fill.r,
            self.fill.g,
            self.fill.b,
            self.thickness,
            self.stroke.r,
            self.stroke.g,
            self.stroke.b,
            self.second_thickness,
            self.dual_stroke.r,
            self.dual_stroke.g,
            self.dual_stroke.b,
            self.dash_repeats,
            self.inside_color.r,
            self.inside_color.g,
            self.inside_color.b,
            self.dash_length,
            self.camera_position[0],
            self.camera_position[1],
            self.camera_position[2],
            self.dash_offset,
            self.resolution[0],
            self.resolution[1],
            self.time,
            self.noise_scale,
            self.noise_a_intensity,
            self.noise_b_intensity,
            self.squeeze_min,
            self.squeeze_max,
            self.depth_fade_near,
            self.depth_fade_far,
            0.0,
            0.0,
        ];
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

/// String-keyed uniform values as they arrive from the outside.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniformValues(BTreeMap<String, UniformValue>);

impl UniformValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<UniformValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<UniformValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&UniformValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &UniformValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_is_packed_to_declared_size() {
        let bytes = WireframeUniforms::default().to_bytes();
        assert_eq!(bytes.len(), UNIFORM_BLOCK_SIZE);
        // thickness sits right after the fill color
        assert_eq!(&bytes[12..16], &0.02f32.to_le_bytes());
    }

    #[test]
    fn apply_skips_unknown_keys_and_bad_types() {
        let mut uniforms = WireframeUniforms::default();
        let values = UniformValues::new()
            .with("thickness", 0.1f32)
            .with("stroke", Color::rgb(1.0, 0.0, 0.0))
            .with("bogus", 1.0f32)
            .with("dashRepeats", [1.0f32, 2.0]);
        assert_eq!(uniforms.apply(&values), 2);
        assert_eq!(uniforms.thickness, 0.1);
        assert_eq!(uniforms.stroke, Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(uniforms.dash_repeats, WireframeUniforms::default().dash_repeats);
    }

    #[test]
    fn colors_accept_plain_vectors() {
        let mut uniforms = WireframeUniforms::default();
        assert!(uniforms.set(UniformField::Fill, UniformValue::Vec3([0.5, 0.5, 0.5])));
        assert_eq!(uniforms.fill, Color::rgb(0.5, 0.5, 0.5));
        assert!(!uniforms.set(UniformField::Fill, UniformValue::Float(1.0)));
    }

    #[test]
    fn non_color_fields_never_write_fill() {
        let mut uniforms = WireframeUniforms::default();
        let fill = uniforms.fill;
        assert!(!uniforms.set(UniformField::Thickness, UniformValue::Vec3([1.0, 0.0, 0.0])));
        assert!(!uniforms.set(UniformField::Time, Color::WHITE.into()));
        assert!(uniforms.set(UniformField::InsideColor, UniformValue::Vec3([0.0, 0.0, 1.0])));
        assert_eq!(uniforms.fill, fill);
        assert_eq!(uniforms.inside_color, Color::rgb(0.0, 0.0, 1.0));
    }

    #[test]
    fn every_key_round_trips_through_get_and_set() {
        let mut uniforms = WireframeUniforms::default();
        for key in UniformField::keys() {
            let field = UniformField::from_key(key).expect("table key resolves");
            let value = uniforms.get(field);
            assert!(uniforms.set(field, value), "{key} rejects its own value");
        }
    }

    #[test]
    fn values_deserialize_from_json() -> serde_json::Result<()> {
        let values: UniformValues = serde_json::from_str(
            r##"{ "thickness": 0.05, "fill": "#ff0000", "resolution": [800, 600], "cameraPosition": [0, 1, 2] }"##,
        )?;
        assert_eq!(values.get("thickness"), Some(&UniformValue::Float(0.05)));
        assert_eq!(values.get("resolution"), Some(&UniformValue::Vec2([800.0, 600.0])));
        assert!(matches!(values.get("fill"), Some(UniformValue::Color(_))));
        assert!(matches!(values.get("cameraPosition"), Some(UniformValue::Vec3(_))));
        Ok(())
    }
}
