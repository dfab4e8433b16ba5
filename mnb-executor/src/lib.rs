//! Container lifecycle, mounts, and stdio plumbing for mnb build actions.
//!
//! [`Executor`] drives a [`mnb_planner::Plan`] against a Docker daemon: `PullImage` and
//! `BuildImage` actions talk to the Engine API directly ([`pull`], [`build`]); `Exec` actions
//! go through [`exec::run`], which creates a container, attaches to it, pumps stdin/stdout/
//! stderr concurrently, and copies outputs back out. [`partition`] enforces the invariants
//! scoped to a single `Exec`; [`git`] and [`context`] resolve and pack build contexts; the two
//! are independent so `mnb-planner` never needs to know about either.

pub mod build;
pub mod context;
pub mod error;
pub mod exec;
pub mod git;
pub mod host_path;
pub mod partition;
pub mod pull;

use bollard::Docker;
use bytes::Bytes;
use error::Result;
use host_path::PathFlavor;
use mnb_planner::Plan;
use mnb_spec::{Action, Spec};
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Drives a plan's actions against a Docker daemon, rooted at a working directory that holds
/// every relative path a `Spec` refers to.
pub struct Executor {
    docker: Docker,
    root: PathBuf,
    host_flavor: PathFlavor,
    next_action_id: AtomicUsize,
}

impl Executor {
    pub fn new(docker: Docker, root: impl Into<PathBuf>, host_flavor: PathFlavor) -> Self {
        Self {
            docker,
            root: root.into(),
            host_flavor,
            next_action_id: AtomicUsize::new(0),
        }
    }

    /// Connect to the local Docker daemon the same way the `docker` CLI does (`DOCKER_HOST`,
    /// falling back to the platform's default socket or named pipe).
    pub fn connect(root: impl Into<PathBuf>, host_flavor: PathFlavor) -> Result<Self> {
        let docker =
            Docker::connect_with_local_defaults().context(error::ConnectSnafu)?;
        Ok(Self::new(docker, root, host_flavor))
    }

    /// Realize every action in `plan` against `spec`, in order. Returns the stdout captured
    /// from the last `Exec` action (empty if the plan ran none), which is all a caller needs
    /// to pursue the two-stage generator pipeline.
    pub async fn run_plan(&self, spec: &Spec, plan: &Plan) -> Result<Bytes> {
        let mut last_stdout = Bytes::new();
        for action in plan.actions(spec) {
            last_stdout = self.run_action(action).await?;
        }
        Ok(last_stdout)
    }

    async fn run_action(&self, action: &Action) -> Result<Bytes> {
        match action {
            Action::PullImage(pull_image) => {
                pull::pull(&self.docker, pull_image).await?;
                Ok(Bytes::new())
            }
            Action::BuildImage(build_image) => {
                build::build(&self.docker, &self.root, build_image).await?;
                Ok(Bytes::new())
            }
            Action::Exec(action_exec) => {
                let action_id = self.next_action_id.fetch_add(1, Ordering::SeqCst);
                exec::run(
                    &self.docker,
                    &self.root,
                    self.host_flavor,
                    action_id,
                    action_exec,
                )
                .await
            }
        }
    }
}
