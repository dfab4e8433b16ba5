//! Packs a build context directory into the tar stream the Docker Engine API's image build
//! endpoint expects.

use crate::error::{self, Result};
use snafu::ResultExt;
use std::path::Path;
use walkdir::WalkDir;

/// Tar up every file under `context_path` (recursively), using paths relative to it as the
/// archive entry names, so the resulting bytes are a valid `docker build` context.
pub fn tar_directory(context_path: &Path) -> Result<Vec<u8>> {
    let mut builder = tar::Builder::new(Vec::new());

    for entry in WalkDir::new(context_path) {
        let entry = entry.context(error::ContextWalkSnafu {
            path: context_path.to_path_buf(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(context_path)
            .expect("walkdir entries are rooted at context_path");
        builder
            .append_path_with_name(entry.path(), relative)
            .context(error::TarContextSnafu {
                path: context_path.to_path_buf(),
            })?;
    }

    builder.into_inner().context(error::TarContextSnafu {
        path: context_path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;

    #[test]
    fn tars_nested_files_with_relative_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Dockerfile"), b"FROM scratch\n").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub").join("file.txt"), b"hi").unwrap();

        let bytes = tar_directory(dir.path()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                e.path().unwrap().to_string_lossy().into_owned()
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["Dockerfile", "sub/file.txt"]);
    }

    #[test]
    fn tarred_file_contents_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"contents").unwrap();

        let bytes = tar_directory(dir.path()).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut entries = archive.entries().unwrap();
        let mut entry = entries.next().unwrap().unwrap();
        let mut buf = String::new();
        entry.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "contents");
    }
}
