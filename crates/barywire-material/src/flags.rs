use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Compile-time switches of the wireframe shader.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureFlag {
    DashAnimate,
    DashEnabled,
    DashOverlap,
    DepthFade,
    DualStroke,
    InsideAltColor,
    NoiseA,
    NoiseB,
    SeeThrough,
    Squeeze,
}

impl FeatureFlag {
    /// Sorted by external name; this order defines the cache key.
    pub const ALL: [FeatureFlag; 10] = [
        FeatureFlag::DashAnimate,
        FeatureFlag::DashEnabled,
        FeatureFlag::DashOverlap,
        FeatureFlag::DepthFade,
        FeatureFlag::DualStroke,
        FeatureFlag::InsideAltColor,
        FeatureFlag::NoiseA,
        FeatureFlag::NoiseB,
        FeatureFlag::SeeThrough,
        FeatureFlag::Squeeze,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FeatureFlag::DashAnimate => "dashAnimate",
            FeatureFlag::DashEnabled => "dashEnabled",
            FeatureFlag::DashOverlap => "dashOverlap",
            FeatureFlag::DepthFade => "depthFade",
            FeatureFlag::DualStroke => "dualStroke",
            FeatureFlag::InsideAltColor => "insideAltColor",
            FeatureFlag::NoiseA => "noiseA",
            FeatureFlag::NoiseB => "noiseB",
            FeatureFlag::SeeThrough => "seeThrough",
            FeatureFlag::Squeeze => "squeeze",
        }
    }

    pub fn define(self) -> &'static str {
        match self {
            FeatureFlag::DashAnimate => "USE_DASH_ANIMATE",
            FeatureFlag::DashEnabled => "USE_DASH",
            FeatureFlag::DashOverlap => "USE_DASH_OVERLAP",
            FeatureFlag::DepthFade => "USE_DEPTH_FADE",
            FeatureFlag::DualStroke => "USE_DUAL_STROKE",
            FeatureFlag::InsideAltColor => "USE_INSIDE_ALT_COLOR",
            FeatureFlag::NoiseA => "USE_NOISE_A",
            FeatureFlag::NoiseB => "USE_NOISE_B",
            FeatureFlag::SeeThrough => "USE_SEE_THROUGH",
            FeatureFlag::Squeeze => "USE_SQUEEZE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|flag| flag.name() == name)
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureFlags {
    pub noise_a: bool,
    pub noise_b: bool,
    pub depth_fade: bool,
    pub squeeze: bool,
    pub dash_enabled: bool,
    pub dash_animate: bool,
    pub dash_overlap: bool,
    pub dual_stroke: bool,
    pub see_through: bool,
    pub inside_alt_color: bool,
}

impl FeatureFlags {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        let mut flags = Self::default();
        for flag in FeatureFlag::ALL {
            flags.set(flag, true);
        }
        flags
    }

    pub fn with(mut self, flag: FeatureFlag, value: bool) -> Self {
        self.set(flag, value);
        self
    }

    pub fn get(&self, flag: FeatureFlag) -> bool {
        match flag {
            FeatureFlag::DashAnimate => self.dash_animate,
            FeatureFlag::DashEnabled => self.dash_enabled,
            FeatureFlag::DashOverlap => self.dash_overlap,
            FeatureFlag::DepthFade => self.depth_fade,
            FeatureFlag::DualStroke => self.dual_stroke,
            FeatureFlag::InsideAltColor => self.inside_alt_color,
            FeatureFlag::NoiseA => self.noise_a,
            FeatureFlag::NoiseB => self.noise_b,
            FeatureFlag::SeeThrough => self.see_through,
            FeatureFlag::Squeeze => self.squeeze,
        }
    }

    pub fn set(&mut self, flag: FeatureFlag, value: bool) {
        let slot = match flag {
            FeatureFlag::DashAnimate => &mut self.dash_animate,
            FeatureFlag::DashEnabled => &mut self.dash_enabled,
            FeatureFlag::DashOverlap => &mut self.dash_overlap,
            FeatureFlag::DepthFade => &mut self.depth_fade,
            FeatureFlag::DualStroke => &mut self.dual_stroke,
            FeatureFlag::InsideAltColor => &mut self.inside_alt_color,
            FeatureFlag::NoiseA => &mut self.noise_a,
            FeatureFlag::NoiseB => &mut self.noise_b,
            FeatureFlag::SeeThrough => &mut self.see_through,
            FeatureFlag::Squeeze => &mut self.squeeze,
        };
        *slot = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureFlag, bool)> + '_ {
        FeatureFlag::ALL.into_iter().map(|flag| (flag, self.get(flag)))
    }

    pub fn enabled(&self) -> impl Iterator<Item = FeatureFlag> + '_ {
        self.iter().filter(|(_, on)| *on).map(|(flag, _)| flag)
    }

    /// `name:value` pairs in name order joined by `|`.
    pub fn cache_key(&self) -> VariantKey {
        let key = self
            .iter()
            .map(|(flag, value)| format!("{}:{}", flag.name(), value))
            .collect::<Vec<_>>()
            .join("|");
        VariantKey(key)
    }
}

/// Canonical identity of a flag combination.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey(String);

impl VariantKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A partial flag set: only the flags present are meant to change.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, bool>", into = "BTreeMap<String, bool>")]
pub struct FeatureFlagsPatch {
    values: BTreeMap<FeatureFlag, bool>,
}

impl FeatureFlagsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, flag: FeatureFlag, value: bool) -> Self {
        self.set(flag, value);
        self
    }

    pub fn set(&mut self, flag: FeatureFlag, value: bool) {
        self.values.insert(flag, value);
    }

    pub fn get(&self, flag: FeatureFlag) -> Option<bool> {
        self.values.get(&flag).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Builds a patch from external `(name, value)` pairs; names that are not
    /// flags are skipped.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: AsRef<str>,
    {
        let mut patch = Self::default();
        for (name, value) in pairs {
            match FeatureFlag::from_name(name.as_ref()) {
                Some(flag) => patch.set(flag, value),
                None => debug!(key = name.as_ref(), "ignoring unknown feature flag"),
            }
        }
        patch
    }

    /// Writes differing values into `flags` and returns the flags that changed.
    pub fn apply_to(&self, flags: &mut FeatureFlags) -> Vec<FeatureFlag> {
        let mut changed = Vec::new();
        for (&flag, &value) in &self.values {
            if flags.get(flag) != value {
                flags.set(flag, value);
                changed.push(flag);
            }
        }
        changed
    }

    /// Flags not mentioned in the patch keep their default (off).
    pub fn to_flags(&self) -> FeatureFlags {
        let mut flags = FeatureFlags::default();
        self.apply_to(&mut flags);
        flags
    }
}

impl From<FeatureFlags> for FeatureFlagsPatch {
    fn from(value: FeatureFlags) -> Self {
        Self {
            values: value.iter().collect(),
        }
    }
}

impl From<BTreeMap<String, bool>> for FeatureFlagsPatch {
    fn from(value: BTreeMap<String, bool>) -> Self {
        Self::from_pairs(value)
    }
}

impl From<FeatureFlagsPatch> for BTreeMap<String, bool> {
    fn from(value: FeatureFlagsPatch) -> Self {
        value
            .values
            .into_iter()
            .map(|(flag, on)| (flag.name().to_string(), on))
            .collect()
    }
}
