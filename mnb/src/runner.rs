//! Two-stage build driver: locate the entry spec, execute it, re-parse its last action's
//! captured stdout as a second spec, and execute that one too. Both stages share the same
//! [`Executor`], so the container runtime connection and scratch-directory numbering carry
//! across the boundary between the generator and what it generates.

use anyhow::{Context, Result};
use handlebars::Handlebars;
use mnb_executor::host_path::PathFlavor;
use mnb_executor::Executor;
use mnb_spec::Spec;
use std::path::Path;

const ENTRY_SPEC_FILE: &str = "mnb.json";
const POSIX_LAUNCHER_NAME: &str = "mnb";
const WINDOWS_LAUNCHER_NAME: &str = "mnb.cmd";

const POSIX_LAUNCHER_TEMPLATE: &str = r#"#!/bin/sh
# Generated by mnb {{version}}. Re-render with `mnb scripts`.
set -eu
exec docker run --rm -it \
    -v "$(pwd):/mnb/run" \
    -w /mnb/run \
    mnb/build:{{version}} \
    mnb "$@"
"#;

const WINDOWS_LAUNCHER_TEMPLATE: &str = r#"@echo off
rem Generated by mnb {{version}}. Re-render with `mnb scripts`.
docker run --rm -it ^
    -v "%cd%:/mnb/run" ^
    -w /mnb/run ^
    mnb/build:{{version}} ^
    mnb %*
"#;

/// Run the two-stage pipeline against `root`: decode and execute the entry spec, then decode
/// and execute the spec its last action wrote to stdout.
pub(crate) async fn update(root: &Path, host_flavor: PathFlavor) -> Result<()> {
    let executor =
        Executor::connect(root, host_flavor).context("failed to connect to the Docker daemon")?;

    let stage_one = read_spec(root, ENTRY_SPEC_FILE)?;
    let stage_one_plan = mnb_planner::plan(&stage_one).context("failed to plan the entry spec")?;
    let generated = executor
        .run_plan(&stage_one, &stage_one_plan)
        .await
        .context("failed to execute the entry spec")?;

    let stage_two = mnb_spec::decode(&generated)
        .context("failed to parse the generator's stdout as a spec")?;
    let stage_two_plan =
        mnb_planner::plan(&stage_two).context("failed to plan the generated spec")?;
    executor
        .run_plan(&stage_two, &stage_two_plan)
        .await
        .context("failed to execute the generated spec")?;

    Ok(())
}

fn read_spec(root: &Path, file_name: &str) -> Result<Spec> {
    let path = root.join(file_name);
    let bytes = std::fs::read(&path)
        .with_context(|| format!("failed to read entry spec at '{}'", path.display()))?;
    mnb_spec::decode(&bytes)
        .with_context(|| format!("failed to parse entry spec at '{}'", path.display()))
}

/// Create an empty entry spec (unless one already exists) and render the launcher scripts.
pub(crate) fn init(root: &Path) -> Result<()> {
    let entry_path = root.join(ENTRY_SPEC_FILE);
    if entry_path.exists() {
        log::info!(
            "'{}' already exists, leaving it untouched",
            entry_path.display()
        );
    } else {
        let empty = Spec::new(mnb_spec::SUPPORTED_VERSION);
        let encoded =
            mnb_spec::encode_pretty(&empty).context("failed to encode an empty spec")?;
        std::fs::write(&entry_path, encoded)
            .with_context(|| format!("failed to write '{}'", entry_path.display()))?;
    }
    scripts(root)
}

/// Re-render only the launcher scripts.
pub(crate) fn scripts(root: &Path) -> Result<()> {
    let handlebars = Handlebars::new();
    let data = serde_json::json!({ "version": env!("CARGO_PKG_VERSION") });

    render_script(
        &handlebars,
        &data,
        root,
        POSIX_LAUNCHER_NAME,
        POSIX_LAUNCHER_TEMPLATE,
        true,
    )?;
    render_script(
        &handlebars,
        &data,
        root,
        WINDOWS_LAUNCHER_NAME,
        WINDOWS_LAUNCHER_TEMPLATE,
        false,
    )?;
    Ok(())
}

fn render_script(
    handlebars: &Handlebars<'_>,
    data: &serde_json::Value,
    root: &Path,
    name: &str,
    template: &str,
    executable: bool,
) -> Result<()> {
    let rendered = handlebars
        .render_template(template, data)
        .with_context(|| format!("failed to render launcher script '{name}'"))?;
    let path = root.join(name);
    std::fs::write(&path, rendered)
        .with_context(|| format!("failed to write launcher script '{}'", path.display()))?;

    #[cfg(unix)]
    if executable {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&path)
            .with_context(|| format!("failed to stat '{}'", path.display()))?
            .permissions();
        perms.set_mode(perms.mode() | 0o111);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to mark '{}' executable", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = executable;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_creates_an_empty_entry_spec_and_launcher_scripts() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path()).unwrap();

        let spec = read_spec(dir.path(), ENTRY_SPEC_FILE).unwrap();
        assert!(spec.actions.is_empty());
        assert!(dir.path().join(POSIX_LAUNCHER_NAME).is_file());
        assert!(dir.path().join(WINDOWS_LAUNCHER_NAME).is_file());
    }

    #[test]
    fn init_does_not_clobber_an_existing_entry_spec() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(ENTRY_SPEC_FILE), b"not a valid spec").unwrap();

        init(dir.path()).unwrap();

        let contents = std::fs::read(dir.path().join(ENTRY_SPEC_FILE)).unwrap();
        assert_eq!(contents, b"not a valid spec");
    }

    #[test]
    fn scripts_renders_the_current_package_version() {
        let dir = tempfile::tempdir().unwrap();
        scripts(dir.path()).unwrap();

        let rendered = std::fs::read_to_string(dir.path().join(POSIX_LAUNCHER_NAME)).unwrap();
        assert!(rendered.contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn update_reports_a_missing_entry_spec() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_spec(dir.path(), ENTRY_SPEC_FILE).unwrap_err();
        assert!(err.to_string().contains("failed to read entry spec"));
    }
}
