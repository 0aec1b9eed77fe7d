//! The stage marker.

use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// One point in the total order a deployment unit passes through.
///
/// Stages compare by their position in the owning [`StageTable`]. Values
/// handed in from outside (including the associated constants) are
/// resolved against the table by name before they are used, so custom
/// tables with inserted stages stay consistent.
///
/// [`StageTable`]: super::StageTable
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stage {
    name: Cow<'static, str>,
    index: usize,
}

impl Stage {
    /// The synthetic floor: nothing deployed.
    pub const NOT_INSTALLED: Self = Self::builtin("NotInstalled", 0);
    /// Structure and descriptor parsing.
    pub const PARSE: Self = Self::builtin("Parse", 1);
    /// After parsing.
    pub const POST_PARSE: Self = Self::builtin("PostParse", 2);
    /// Before describing.
    pub const PRE_DESCRIBE: Self = Self::builtin("PreDescribe", 3);
    /// Dependency description.
    pub const DESCRIBE: Self = Self::builtin("Describe", 4);
    /// Classloader construction.
    pub const CLASSLOADER: Self = Self::builtin("ClassLoader", 5);
    /// After classloader construction.
    pub const POST_CLASSLOADER: Self = Self::builtin("PostClassLoader", 6);
    /// Before the real deployment.
    pub const PRE_REAL: Self = Self::builtin("PreReal", 7);
    /// The real deployment.
    pub const REAL: Self = Self::builtin("Real", 8);
    /// Fully installed.
    pub const INSTALLED: Self = Self::builtin("Installed", 9);

    /// The standard chain, floor first.
    pub const STANDARD: [Self; 10] = [
        Self::NOT_INSTALLED,
        Self::PARSE,
        Self::POST_PARSE,
        Self::PRE_DESCRIBE,
        Self::DESCRIBE,
        Self::CLASSLOADER,
        Self::POST_CLASSLOADER,
        Self::PRE_REAL,
        Self::REAL,
        Self::INSTALLED,
    ];

    const fn builtin(name: &'static str, index: usize) -> Self {
        Self {
            name: Cow::Borrowed(name),
            index,
        }
    }

    pub(crate) fn new(name: impl Into<Cow<'static, str>>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Returns the stage name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the position of this stage in its table.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Returns true if this is the floor of a table.
    #[must_use]
    pub const fn is_floor(&self) -> bool {
        self.index == 0
    }
}

impl Ord for Stage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index
            .cmp(&other.index)
            .then_with(|| self.name.cmp(&other.name))
    }
}

impl PartialOrd for Stage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl Serialize for Stage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_chain_is_strictly_ordered() {
        for (i, a) in Stage::STANDARD.iter().enumerate() {
            assert_eq!(a.index(), i);
            for b in &Stage::STANDARD {
                let relations = [a < b, a == b, a > b];
                assert_eq!(relations.iter().filter(|r| **r).count(), 1);
            }
        }
    }

    #[test]
    fn test_stage_display_and_serialize() {
        assert_eq!(Stage::CLASSLOADER.to_string(), "ClassLoader");
        let json = serde_json::to_string(&Stage::PRE_REAL).unwrap();
        assert_eq!(json, r#""PreReal""#);
    }

    #[test]
    fn test_floor() {
        assert!(Stage::NOT_INSTALLED.is_floor());
        assert!(!Stage::PARSE.is_floor());
    }
}
