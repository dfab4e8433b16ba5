use snafu::Snafu;
use std::path::PathBuf;

/// Errors raised while realizing a single action against the container runtime.
///
/// These include invariants that are only knowable from a single [`mnb_spec::Exec`]'s own
/// inputs/outputs (`ConflictingMounts`, `ConflictingEnvironmentAssignments`,
/// `IncompatibleValueAndThrough`) as well as the runtime-facing failures: image pull/build,
/// container lifecycle, socket I/O, git, and filesystem errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum Error {
    #[snafu(display(
        "exec has two inputs bound to the same container path '{path}'; each input must have a \
         distinct `through` path"
    ))]
    ConflictingMounts { path: String },

    #[snafu(display(
        "exec has two inputs assigned to the same environment variable '{name}'"
    ))]
    ConflictingEnvironmentAssignments { name: String },

    #[snafu(display(
        "value kind does not match its `through` kind at path '{path}': {reason}"
    ))]
    IncompatibleValueAndThrough { path: String, reason: String },

    #[snafu(display("failed to connect to the Docker daemon: {source}"))]
    Connect { source: bollard::errors::Error },

    #[snafu(display("failed to pull image '{image_name}': {source}"))]
    Pull {
        image_name: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("failed to build image '{image_name}': {source}"))]
    Build {
        image_name: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("build of image '{image_name}' failed: {message}"))]
    BuildFailed { image_name: String, message: String },

    #[snafu(display("failed to tag image '{image_name}' as '{tag}': {source}"))]
    Tag {
        image_name: String,
        tag: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("failed to create container for image '{image_name}': {source}"))]
    ContainerCreate {
        image_name: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("failed to attach to container for image '{image_name}': {source}"))]
    ContainerAttach {
        image_name: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("failed to start container '{container_id}': {source}"))]
    ContainerStart {
        container_id: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("failed to inspect container '{container_id}': {source}"))]
    ContainerInspect {
        container_id: String,
        source: bollard::errors::Error,
    },

    #[snafu(display("failed to write to container stdin: {source}"))]
    StdinWrite { source: std::io::Error },

    #[snafu(display("container exited with a fatal error before reporting its exit code"))]
    MissingExitCode,

    #[snafu(display(
        "exec against image '{image_name}' exited with status {exit_code}; stderr:\n{stderr}"
    ))]
    NonZeroExit {
        image_name: String,
        exit_code: i64,
        stderr: String,
    },

    #[snafu(display("failed to create directory '{}': {source}", path.display()))]
    DirectoryCreate {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to read file '{}': {source}", path.display()))]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to write file '{}': {source}", path.display()))]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to copy '{}' to '{}': {source}", from.display(), to.display()))]
    FileCopy {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("environment variable '{name}' references non-UTF-8 file contents"))]
    EnvironmentNotUtf8 { name: String },

    #[snafu(display("failed to build tar archive for build context '{}': {source}", path.display()))]
    TarContext {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("failed to walk build context '{}': {source}", path.display()))]
    ContextWalk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("git operation failed for repository '{repo}': {source}"))]
    Git {
        repo: String,
        source: git2::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
