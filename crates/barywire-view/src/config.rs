use std::path::{Path, PathBuf};

use barywire_base::{Error, Result, Viewport};
use barywire_material::{FeatureFlags, FeatureFlagsPatch, UniformValues};
use cgmath::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Scene description for a viewer session, read from JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub mesh: Option<PathBuf>,
    pub remove_edge: bool,
    pub features: FeatureFlags,
    pub uniforms: UniformValues,
    pub viewport: Viewport,
    pub pixel_ratio: f32,
    pub frames: u32,
    pub frame_step: f32,
    pub camera: OrbitCamera,
    /// Feature or uniform changes applied at given frames, the way a GUI
    /// panel would during an interactive session.
    pub timeline: Vec<TimelineEvent>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            mesh: None,
            remove_edge: false,
            features: FeatureFlags::default(),
            uniforms: UniformValues::default(),
            viewport: Viewport::default(),
            pixel_ratio: 1.0,
            frames: 60,
            frame_step: 1.0 / 60.0,
            camera: OrbitCamera::default(),
            timeline: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineEvent {
    pub frame: u32,
    pub features: Option<FeatureFlagsPatch>,
    pub uniforms: Option<UniformValues>,
    pub resize: Option<Viewport>,
}

/// Camera circling the target at a fixed distance and elevation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbitCamera {
    pub target: [f32; 3],
    pub distance: f32,
    /// Elevation in radians.
    pub pitch: f32,
    /// Radians per second around the vertical axis.
    pub spin: f32,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            target: [0.0, 0.0, 0.0],
            distance: 5.0,
            pitch: 0.35,
            spin: 0.25,
        }
    }
}

impl OrbitCamera {
    pub fn position(&self, elapsed: f32) -> Point3<f32> {
        let yaw = elapsed * self.spin;
        let dir = Vector3::new(
            self.pitch.cos() * yaw.sin(),
            self.pitch.sin(),
            self.pitch.cos() * yaw.cos(),
        );
        Point3::from(self.target) + dir * self.distance
    }
}

impl ViewConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| Error::ResourceLoad {
            path: path.display().to_string(),
            reason: err.to_string(),
        })?;
        let mut config: ViewConfig = serde_json::from_str(&text)?;
        // Mesh paths are relative to the config file.
        if let (Some(mesh), Some(dir)) = (config.mesh.as_mut(), path.parent()) {
            if mesh.is_relative() {
                let joined = dir.join(mesh.as_path());
                *mesh = joined;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pixel_ratio.is_nan() || self.pixel_ratio <= 0.0 {
            return Err(Error::InvalidParameter("pixel_ratio must be > 0".to_string()));
        }
        if self.frame_step.is_nan() || self.frame_step < 0.0 {
            return Err(Error::InvalidParameter("frame_step must be >= 0".to_string()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(Error::InvalidParameter("viewport must not be empty".to_string()));
        }
        Ok(())
    }
}
