use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A capability a provider may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureFlag {
    /// The repository supports archiving.
    Archive,
    /// The repository can produce a file listing.
    List,
    /// Files may be retrieved from the repository.
    Retrieve,
    /// Files may be submitted to the repository.
    Submit,
}

impl FeatureFlag {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "archive" => Some(Self::Archive),
            "list" => Some(Self::List),
            "retrieve" => Some(Self::Retrieve),
            "submit" => Some(Self::Submit),
            _ => None,
        }
    }

    pub fn all() -> [FeatureFlag; 4] {
        [Self::Archive, Self::List, Self::Retrieve, Self::Submit]
    }
}

impl fmt::Display for FeatureFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::List => write!(f, "list"),
            Self::Retrieve => write!(f, "retrieve"),
            Self::Submit => write!(f, "submit"),
        }
    }
}

/// The set of features a provider supports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeSet<FeatureFlag>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, flag: FeatureFlag) -> bool {
        self.0.contains(&flag)
    }

    pub fn insert(&mut self, flag: FeatureFlag) -> bool {
        self.0.insert(flag)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = FeatureFlag> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<FeatureFlag> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureFlag>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[FeatureFlag; N]> for FeatureSet {
    fn from(flags: [FeatureFlag; N]) -> Self {
        flags.into_iter().collect()
    }
}

impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|flag| flag.to_string()).collect();
        f.write_str(&names.join(", "))
    }
}
