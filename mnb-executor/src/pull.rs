//! Realizes a `PullImage` action: stream the image down through the Docker Engine API.

use crate::error::{self, Result};
use bollard::image::CreateImageOptions;
use bollard::Docker;
use futures::StreamExt;
use mnb_spec::PullImage;
use snafu::ResultExt;

/// Pull `pull_image.image_name`, splitting it into repository and tag at the first `:`. An
/// absent tag defaults to `latest`; leaving it empty would make the Engine API pull every tag
/// in the repository instead.
pub async fn pull(docker: &Docker, pull_image: &PullImage) -> Result<()> {
    let (repository, tag) = pull_image.repository_and_tag();
    log::info!("pulling image '{}'", pull_image.image_name);

    let options = CreateImageOptions {
        from_image: repository,
        tag: tag.unwrap_or("latest"),
        ..Default::default()
    };

    let mut stream = docker.create_image(Some(options), None, None);
    while let Some(progress) = stream.next().await {
        let info = progress.context(error::PullSnafu {
            image_name: pull_image.image_name.clone(),
        })?;
        if let Some(status) = &info.status {
            log::debug!("pull {}: {}", pull_image.image_name, status);
        }
    }

    Ok(())
}
