use snafu::Snafu;

/// Errors raised while decoding or validating the shape of a specification document.
///
/// These are all detectable without looking at any other action in the document; errors
/// that depend on cross-action state (image conflicts, missing producers, ...) belong to
/// `mnb-planner`, and errors that depend on a single [`crate::model::Exec`]'s own
/// inputs/outputs (conflicting mounts, incompatible value/through pairings) belong to
/// `mnb-executor`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display("Failed to parse spec JSON: {source}"))]
    Json { source: serde_json::Error },

    #[snafu(display("stream name '{name}' is not valid on an {position}, expected {expected}"))]
    MisplacedStream {
        name: String,
        position: &'static str,
        expected: &'static str,
    },

    #[snafu(display("output 'through: dir' is a reserved shape and is not implemented"))]
    UnsupportedDirOutput,

    #[snafu(display(
        "spec_version {major}.{minor} is not supported; this build supports up to {}.{}",
        crate::SUPPORTED_VERSION.major, crate::SUPPORTED_VERSION.minor
    ))]
    UnsupportedVersion { major: u64, minor: u64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
