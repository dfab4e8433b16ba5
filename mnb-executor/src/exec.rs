//! Realizes an `Exec` action: builds mounts/env from its partitioned inputs, creates and
//! attaches to a container, pumps stdin/stdout/stderr concurrently, and copies outputs once
//! the container exits successfully.
//!
//! Mirrors the state machine in the specification: Prepared -> Created -> Running -> Finished
//! -> Succeeded/Failed. Each step below is one transition; the container is removed on every
//! exit path, success or failure.

use crate::error::{self, Result};
use crate::host_path::PathFlavor;
use crate::partition::{self, Partitioned};
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions, LogOutput,
    RemoveContainerOptions,
};
use bollard::service::HostConfig;
use bollard::Docker;
use bytes::Bytes;
use futures::StreamExt;
use mnb_spec::Exec;
use snafu::{OptionExt, ResultExt};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

const STDIN_CHUNK_SIZE: usize = 512;
const CONTAINER_ROOT: &str = "/mnb/run";

/// Everything the container needs copied out on success, and the buffers to capture into.
struct Outcome {
    stdout: Bytes,
}

/// Realize `exec`, identified for scratch-directory purposes by `action_id` (unique per
/// action instance within a run). Returns the captured stdout buffer.
pub async fn run(
    docker: &Docker,
    root: &Path,
    host_flavor: PathFlavor,
    action_id: usize,
    exec: &Exec,
) -> Result<Bytes> {
    let partitioned = partition::partition(exec)?;
    let scratch_dir = scratch_dir(root, action_id);
    tokio::fs::create_dir_all(&scratch_dir)
        .await
        .context(error::DirectoryCreateSnafu {
            path: scratch_dir.clone(),
        })?;

    let container_id = create(
        docker,
        root,
        host_flavor,
        &scratch_dir,
        exec,
        &partitioned,
    )
    .await?;

    let outcome = drive(docker, &container_id, root, &scratch_dir, exec, &partitioned).await;

    if let Err(remove_err) = docker
        .remove_container(
            &container_id,
            Some(RemoveContainerOptions {
                force: true,
                ..Default::default()
            }),
        )
        .await
    {
        log::warn!("failed to remove container '{container_id}': {remove_err}");
    }

    Ok(outcome?.stdout)
}

fn scratch_dir(root: &Path, action_id: usize) -> PathBuf {
    root.join(".mnb").join("context").join(action_id.to_string())
}

fn container_path(relative: &str) -> String {
    format!("{CONTAINER_ROOT}/{relative}")
}

async fn create(
    docker: &Docker,
    root: &Path,
    host_flavor: PathFlavor,
    scratch_dir: &Path,
    exec: &Exec,
    partitioned: &Partitioned,
) -> Result<String> {
    let mut binds: Vec<String> = partitioned
        .mounts
        .iter()
        .map(|mount| {
            format!(
                "{}:{}:ro",
                host_flavor.render(&root.join(&mount.host_path)),
                container_path(&mount.container_path)
            )
        })
        .collect();
    binds.push(format!(
        "{}:{CONTAINER_ROOT}",
        host_flavor.render(scratch_dir)
    ));

    let mut env = Vec::with_capacity(partitioned.env.len());
    for (name, path) in &partitioned.env {
        let bytes = tokio::fs::read(root.join(path))
            .await
            .context(error::FileReadSnafu {
                path: root.join(path),
            })?;
        let value = String::from_utf8(bytes)
            .ok()
            .context(error::EnvironmentNotUtf8Snafu { name: name.clone() })?;
        env.push(format!("{name}={value}"));
    }

    let workdir = exec
        .workdir
        .as_deref()
        .map(container_path)
        .unwrap_or_else(|| CONTAINER_ROOT.to_string());

    let config = Config {
        image: Some(exec.image_name.clone()),
        cmd: exec.command.clone(),
        entrypoint: exec.entrypoint.clone().map(|e| vec![e]),
        working_dir: Some(workdir),
        env: Some(env),
        open_stdin: Some(true),
        attach_stdin: Some(true),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        tty: Some(false),
        host_config: Some(HostConfig {
            binds: Some(binds),
            ..Default::default()
        }),
        ..Default::default()
    };

    log::debug!("creating container for image '{}': {config:?}", exec.image_name);

    let container = docker
        .create_container(None::<CreateContainerOptions<String>>, config)
        .await
        .context(error::ContainerCreateSnafu {
            image_name: exec.image_name.clone(),
        })?;

    Ok(container.id)
}

async fn drive(
    docker: &Docker,
    container_id: &str,
    root: &Path,
    scratch_dir: &Path,
    exec: &Exec,
    partitioned: &Partitioned,
) -> Result<Outcome> {
    let AttachContainerResults { mut output, input } = docker
        .attach_container(
            container_id,
            Some(AttachContainerOptions::<String> {
                stdin: Some(true),
                stdout: Some(true),
                stderr: Some(true),
                stream: Some(true),
                logs: Some(false),
                ..Default::default()
            }),
        )
        .await
        .context(error::ContainerAttachSnafu {
            image_name: exec.image_name.clone(),
        })?;

    docker
        .start_container::<String>(container_id, None)
        .await
        .context(error::ContainerStartSnafu {
            container_id: container_id.to_string(),
        })?;

    let stdin_bytes = read_stdin_sources(root, &partitioned.stdin_sources).await?;
    let sender = send_stdin(input, stdin_bytes);
    let receiver = receive_output(&mut output);

    let (send_result, (stdout, stderr)) = tokio::join!(sender, receiver);
    send_result?;

    let inspected = docker
        .inspect_container(container_id, None)
        .await
        .context(error::ContainerInspectSnafu {
            container_id: container_id.to_string(),
        })?;
    let exit_code = inspected
        .state
        .as_ref()
        .and_then(|state| state.exit_code)
        .context(error::MissingExitCodeSnafu)?;

    if exit_code != 0 {
        log::error!(
            "exec against '{}' exited with {exit_code}; stderr:\n{}",
            exec.image_name,
            String::from_utf8_lossy(&stderr)
        );
        return error::NonZeroExitSnafu {
            image_name: exec.image_name.clone(),
            exit_code,
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
        }
        .fail();
    }

    for (container_relative, host_relative) in &partitioned.file_outputs {
        let from = scratch_dir.join(container_relative);
        let to = root.join(host_relative);
        if let Some(parent) = to.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context(error::DirectoryCreateSnafu {
                    path: parent.to_path_buf(),
                })?;
        }
        tokio::fs::copy(&from, &to)
            .await
            .context(error::FileCopySnafu { from, to })?;
    }

    for host_relative in &partitioned.stdout_outputs {
        write_output(root, host_relative, &stdout).await?;
    }
    for host_relative in &partitioned.stderr_outputs {
        write_output(root, host_relative, &stderr).await?;
    }

    Ok(Outcome {
        stdout: Bytes::from(stdout),
    })
}

async fn write_output(root: &Path, host_relative: &str, contents: &[u8]) -> Result<()> {
    let to = root.join(host_relative);
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .context(error::DirectoryCreateSnafu {
                path: parent.to_path_buf(),
            })?;
    }
    tokio::fs::write(&to, contents)
        .await
        .context(error::FileWriteSnafu { path: to })
}

async fn read_stdin_sources(root: &Path, sources: &[String]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for path in sources {
        let mut file = tokio::fs::File::open(root.join(path))
            .await
            .context(error::FileReadSnafu {
                path: root.join(path),
            })?;
        file.read_to_end(&mut bytes)
            .await
            .context(error::FileReadSnafu {
                path: root.join(path),
            })?;
    }
    Ok(bytes)
}

/// Writes `bytes` to the container's attached stdin in fixed-size chunks, advancing a cursor
/// past each short write, then shuts down the write half so the container sees EOF.
async fn send_stdin(mut input: Pin<Box<dyn AsyncWrite + Send>>, bytes: Vec<u8>) -> Result<()> {
    let mut cursor = 0;
    while cursor < bytes.len() {
        let end = (cursor + STDIN_CHUNK_SIZE).min(bytes.len());
        input
            .write_all(&bytes[cursor..end])
            .await
            .context(error::StdinWriteSnafu)?;
        cursor = end;
    }
    input.shutdown().await.context(error::StdinWriteSnafu)?;
    Ok(())
}

/// Reads demuxed output frames until the stream ends, routing each to its stream's buffer.
async fn receive_output(
    output: &mut Pin<Box<dyn futures::Stream<Item = std::result::Result<LogOutput, bollard::errors::Error>> + Send>>,
) -> (Vec<u8>, Vec<u8>) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    while let Some(frame) = output.next().await {
        match frame {
            Ok(LogOutput::StdOut { message }) => stdout.extend_from_slice(&message),
            Ok(LogOutput::StdErr { message }) => stderr.extend_from_slice(&message),
            Ok(LogOutput::Console { message }) => stdout.extend_from_slice(&message),
            Ok(LogOutput::StdIn { .. }) => {}
            Err(err) => {
                log::warn!("error reading container output stream: {err}");
                break;
            }
        }
    }
    (stdout, stderr)
}
