use anyhow::{Context, Result, bail};
use rand::{Rng, rng};
use std::{
    fs::read_dir,
    path::{Path, PathBuf},
};

/// Extensions served by the local picker, matched exactly as the filesystem
/// reports them.
const IMAGE_EXTENSIONS: &[&str] = &["jpeg", "jpg", "png", "gif", "bmp", "webp"];

pub fn random_image(dir: &Path) -> Result<PathBuf> {
    let entries = read_dir(dir)
        .with_context(|| format!("could not read image directory {}", dir.display()))?;

    let mut images = vec![];

    for entry in entries {
        let Ok(entry) = entry else { continue };
        let is_file = entry.file_type().is_ok_and(|file_type| file_type.is_file());
        let path = entry.path();

        if is_file && is_image(&path) {
            images.push(path);
        }
    }

    if images.is_empty() {
        bail!("no image files found in {}", dir.display());
    }

    Ok(images.remove(rng().random_range(0..images.len())))
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| IMAGE_EXTENSIONS.contains(&extension))
}
