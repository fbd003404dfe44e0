use std::{
    borrow::Borrow,
    collections::{btree_map, BTreeMap},
    fmt::Display,
};

use serde::{Deserialize, Serialize};

/// Manifest key of the entry document
pub const ROOT_PATH: &str = "/";

/// Logical path of a resource relative to the worker origin, e.g. `main.js`
/// or `assets/logo.png`. The entry document is [`ROOT_PATH`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourcePath(String);

impl ResourcePath {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self(path.into())
    }

    pub fn root() -> Self {
        Self(ROOT_PATH.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0 == ROOT_PATH
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourcePath {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourcePath {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ResourcePath {
    fn from(path: String) -> Self {
        Self(path)
    }
}

impl Display for ResourcePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque content hash of one version of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new<S: Into<String>>(fingerprint: S) -> Self {
        Self(fingerprint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Fingerprint {
    fn from(fingerprint: &str) -> Self {
        Self::new(fingerprint)
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Every resource of one deployment and its fingerprint.
///
/// Serialises as a flat JSON object so a stored snapshot can be read back by
/// any later version of the worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceManifest(BTreeMap<ResourcePath, Fingerprint>);

impl ResourceManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: Into<ResourcePath>, F: Into<Fingerprint>>(
        &mut self,
        path: P,
        fingerprint: F,
    ) -> Option<Fingerprint> {
        self.0.insert(path.into(), fingerprint.into())
    }

    pub fn get(&self, path: &str) -> Option<&Fingerprint> {
        self.0.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.contains_key(path)
    }

    pub fn has_root(&self) -> bool {
        self.contains(ROOT_PATH)
    }

    /// True if `path` is listed here with the same fingerprint `previous`
    /// recorded for it. A path missing from either side counts as changed.
    pub fn is_unchanged_since(&self, path: &str, previous: &ResourceManifest) -> bool {
        match (self.get(path), previous.get(path)) {
            (Some(current), Some(old)) => current == old,
            _ => false,
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &ResourcePath> {
        self.0.keys()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, ResourcePath, Fingerprint> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<ResourcePath>, F: Into<Fingerprint>> FromIterator<(P, F)> for ResourceManifest {
    fn from_iter<I: IntoIterator<Item = (P, F)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(p, f)| (p.into(), f.into()))
                .collect(),
        )
    }
}

impl<'a> IntoIterator for &'a ResourceManifest {
    type Item = (&'a ResourcePath, &'a Fingerprint);
    type IntoIter = btree_map::Iter<'a, ResourcePath, Fingerprint>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Resources that must be cached before the application can render, in
/// download order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoreShellList(Vec<ResourcePath>);

impl CoreShellList {
    pub fn iter(&self) -> std::slice::Iter<'_, ResourcePath> {
        self.0.iter()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.0.iter().any(|p| p.as_str() == path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<P: Into<ResourcePath>> FromIterator<P> for CoreShellList {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<'a> IntoIterator for &'a CoreShellList {
    type Item = &'a ResourcePath;
    type IntoIter = std::slice::Iter<'a, ResourcePath>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
