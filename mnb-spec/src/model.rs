//! In-memory representation of an mnb build specification.
//!
//! This module is pure data: construction helpers only. The JSON wire format lives in
//! [`crate::codec`]; chained construction helpers mirroring what an embedded scripting DSL
//! would emit live in [`crate::builder`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// `(major, minor)` pair parsed from a `"MAJOR.MINOR"` wire string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SpecVersion {
    pub major: u64,
    pub minor: u64,
}

impl SpecVersion {
    pub const fn new(major: u64, minor: u64) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for SpecVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl Serialize for SpecVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SpecVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_spec_version(&raw).map_err(serde::de::Error::custom)
    }
}

fn parse_spec_version(raw: &str) -> Result<SpecVersion, String> {
    let (maj, min) = raw
        .split_once('.')
        .ok_or_else(|| format!("'{raw}' is not of the form MAJOR.MINOR"))?;
    let major = maj
        .parse()
        .map_err(|_| format!("'{maj}' is not a valid major version"))?;
    let minor = min
        .parse()
        .map_err(|_| format!("'{min}' is not a valid minor version"))?;
    Ok(SpecVersion { major, minor })
}

/// Top-level specification document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    pub spec_version: SpecVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub actions: Vec<Action>,
}

impl Spec {
    pub fn new(spec_version: SpecVersion) -> Self {
        Self {
            spec_version,
            description: None,
            actions: Vec::new(),
        }
    }
}

/// One unit of work in a [`Spec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    PullImage(PullImage),
    BuildImage(BuildImage),
    Exec(Exec),
}

impl Action {
    /// The image name this action, if it is an image producer, makes available.
    pub fn produced_image(&self) -> Option<&str> {
        match self {
            Action::PullImage(p) => Some(&p.image_name),
            Action::BuildImage(b) => Some(&b.image_name),
            Action::Exec(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullImage {
    pub image_name: String,
}

impl PullImage {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
        }
    }

    /// Split `image_name` into `(repository, tag)`. An absent tag means "use the runtime
    /// default tag".
    pub fn repository_and_tag(&self) -> (&str, Option<&str>) {
        split_image_name(&self.image_name)
    }
}

pub(crate) fn split_image_name(image_name: &str) -> (&str, Option<&str>) {
    match image_name.split_once(':') {
        Some((repo, tag)) => (repo, Some(tag)),
        None => (image_name, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildImage {
    pub image_name: String,
    pub context_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub build_args: Vec<BuildArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_git: Option<FromGit>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_tags: Vec<String>,
}

impl BuildImage {
    pub fn new(image_name: impl Into<String>, context_path: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            context_path: context_path.into(),
            dockerfile_path: None,
            build_args: Vec::new(),
            from_git: None,
            extra_tags: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildArg {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromGit {
    pub repo: String,
    pub rev: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exec {
    pub image_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<Input>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<Output>,
}

impl Exec {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_name: image_name.into(),
            command: None,
            entrypoint: None,
            workdir: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub value: Value,
    pub through: Through,
}

impl Input {
    pub fn new(value: Value, through: Through) -> Self {
        Self { value, through }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: Value,
    pub through: Through,
}

impl Output {
    pub fn new(value: Value, through: Through) -> Self {
        Self { value, through }
    }
}

/// A named artifact referenced by an [`Input`] or [`Output`].
///
/// `Image` is not a wire-level variant here: it only ever appears implicitly, as an
/// [`Exec::image_name`], so the planner represents it with a plain `String` key rather than
/// a `Value` variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    File { path: String },
    Dir { path: String },
}

impl Value {
    pub fn path(&self) -> &str {
        match self {
            Value::File { path } | Value::Dir { path } => path,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::File { .. } => ValueKind::File,
            Value::Dir { .. } => ValueKind::Dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    File,
    Dir,
}

/// How a value is surfaced to or from a container process.
///
/// All four shapes are representable here because the wire grammar for inputs and outputs
/// overlaps; [`crate::codec`] is responsible for rejecting the combinations that are only
/// valid on one side (`Stdin` on an output, `Stdout`/`Stderr` on an input, `Dir` on an
/// output).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Through {
    File { path: String },
    Dir { path: String },
    Environment { name: String },
    Stream { name: StreamName },
}

impl Through {
    pub fn path(&self) -> Option<&str> {
        match self {
            Through::File { path } | Through::Dir { path } => Some(path),
            Through::Environment { .. } | Through::Stream { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamName {
    Stdin,
    Stdout,
    Stderr,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_spec_version() {
        assert_eq!(parse_spec_version("1.0").unwrap(), SpecVersion::new(1, 0));
        assert_eq!(
            parse_spec_version("12.34").unwrap(),
            SpecVersion::new(12, 34)
        );
        assert!(parse_spec_version("1").is_err());
        assert!(parse_spec_version("a.b").is_err());
    }

    #[test]
    fn splits_image_name() {
        assert_eq!(split_image_name("bash:5.2"), ("bash", Some("5.2")));
        assert_eq!(split_image_name("bash"), ("bash", None));
    }
}
