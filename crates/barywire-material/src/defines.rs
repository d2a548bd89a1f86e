use std::collections::BTreeSet;

use crate::flags::{FeatureFlag, FeatureFlags};

/// Preprocessor symbols handed to the shader sources.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ShaderDefines(BTreeSet<&'static str>);

/// Symbols to add and remove when moving between two define sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DefineDiff {
    pub added: Vec<&'static str>,
    pub removed: Vec<&'static str>,
}

impl DefineDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

impl ShaderDefines {
    pub fn from_flags(flags: &FeatureFlags) -> Self {
        Self(flags.enabled().map(FeatureFlag::define).collect())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// What changes going from `previous` to `self`.
    pub fn diff(&self, previous: &ShaderDefines) -> DefineDiff {
        DefineDiff {
            added: self.0.difference(&previous.0).copied().collect(),
            removed: previous.0.difference(&self.0).copied().collect(),
        }
    }
}

pub fn defines_for(flags: &FeatureFlags) -> ShaderDefines {
    ShaderDefines::from_flags(flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_define_per_enabled_flag() {
        let flags = FeatureFlags::none()
            .with(FeatureFlag::DashEnabled, true)
            .with(FeatureFlag::SeeThrough, true);
        let defines = defines_for(&flags);
        assert_eq!(defines.iter().collect::<Vec<_>>(), vec!["USE_DASH", "USE_SEE_THROUGH"]);
        assert!(defines_for(&FeatureFlags::none()).is_empty());
        assert_eq!(defines_for(&FeatureFlags::all()).len(), 10);
    }

    #[test]
    fn diff_lists_both_directions() {
        let before = defines_for(&FeatureFlags::none().with(FeatureFlag::NoiseA, true));
        let after = defines_for(&FeatureFlags::none().with(FeatureFlag::NoiseB, true));
        let diff = after.diff(&before);
        assert_eq!(diff.added, vec!["USE_NOISE_B"]);
        assert_eq!(diff.removed, vec!["USE_NOISE_A"]);
        assert!(after.diff(&after).is_empty());
    }
}
