//! Data model and JSON codec for mnb build specifications.
//!
//! A [`model::Spec`] is a pure, immutable-after-construction document: an ordered list of
//! [`model::Action`]s plus a version. This crate owns the shape of that document and the
//! validation that can be performed without looking at any other action (malformed JSON,
//! unknown tags, a stream bound to the wrong I/O direction, a reserved `through: dir` output).
//! Cross-action invariants (image conflicts, missing producers) live in `mnb-planner`; checks
//! scoped to a single [`model::Exec`]'s own inputs/outputs (conflicting mounts, incompatible
//! value/through pairings) live in `mnb-executor`.

pub mod builder;
pub mod codec;
pub mod error;
pub mod model;

pub use codec::{decode, encode, encode_pretty};
pub use error::{Error, Result};
pub use model::{
    Action, BuildArg, BuildImage, Exec, FromGit, Input, Output, PullImage, Spec, SpecVersion,
    StreamName, Through, Value, ValueKind,
};

/// The highest `spec_version` this build understands.
pub const SUPPORTED_VERSION: SpecVersion = SpecVersion::new(1, 0);
