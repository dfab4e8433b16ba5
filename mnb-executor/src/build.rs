//! Realizes a `BuildImage` action: resolve the context (plain directory or git checkout),
//! pack it into a tar stream, and drive the Docker Engine API's build endpoint.

use crate::context::tar_directory;
use crate::error::{self, Result};
use crate::git;
use bollard::image::{BuildImageOptions, TagImageOptions};
use bollard::Docker;
use futures::StreamExt;
use mnb_spec::BuildImage;
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::Path;

/// Build `build_image.image_name` from its context, then apply any `extra_tags`.
pub async fn build(docker: &Docker, root: &Path, build_image: &BuildImage) -> Result<()> {
    let context_root = match &build_image.from_git {
        Some(from_git) => git::resolve(root, from_git)?,
        None => root.to_path_buf(),
    };
    let context_path = context_root.join(&build_image.context_path);

    log::info!(
        "building image '{}' from context '{}'",
        build_image.image_name,
        context_path.display()
    );

    let tarball = tar_directory(&context_path)?;

    let build_args: HashMap<String, String> = build_image
        .build_args
        .iter()
        .map(|arg| (arg.name.clone(), arg.value.clone()))
        .collect();

    let options = BuildImageOptions {
        dockerfile: build_image
            .dockerfile_path
            .clone()
            .unwrap_or_else(|| "Dockerfile".to_string()),
        t: build_image.image_name.clone(),
        buildargs: build_args,
        rm: true,
        ..Default::default()
    };

    let mut stream = docker.build_image(options, None, Some(tarball.into()));
    while let Some(progress) = stream.next().await {
        let info = progress.context(error::BuildSnafu {
            image_name: build_image.image_name.clone(),
        })?;
        if let Some(stream_line) = &info.stream {
            log::info!("build {}: {}", build_image.image_name, stream_line.trim_end());
        }
        if let Some(build_error) = &info.error {
            return error::BuildFailedSnafu {
                image_name: build_image.image_name.clone(),
                message: build_error.clone(),
            }
            .fail();
        }
    }

    for extra_tag in &build_image.extra_tags {
        let (repo, tag) = split_tag(extra_tag);
        docker
            .tag_image(
                &build_image.image_name,
                Some(TagImageOptions {
                    repo,
                    tag: tag.unwrap_or_default(),
                }),
            )
            .await
            .context(error::TagSnafu {
                image_name: build_image.image_name.clone(),
                tag: extra_tag.clone(),
            })?;
    }

    Ok(())
}

fn split_tag(image_name: &str) -> (&str, Option<&str>) {
    match image_name.split_once(':') {
        Some((repo, tag)) => (repo, Some(tag)),
        None => (image_name, None),
    }
}
