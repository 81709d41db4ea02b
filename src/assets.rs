use anyhow::{Context, Error, Result, bail};
use mime_guess::from_path;
use std::{
    fs::File,
    path::{Component, Path},
};
use tiny_http::{Header, Response};

const FRONTEND_DIR: &str = "frontend/dist";

/// The frontend root document.
pub fn index() -> Result<Response<File>> {
    file_response(&Path::new(FRONTEND_DIR).join("index.html"))
}

/// A file under the frontend asset bundle. `request_path` is the URL path
/// including the `/assets/` prefix.
pub fn asset(request_path: &str) -> Result<Response<File>> {
    let relative = Path::new(request_path.trim_start_matches('/'));

    // Reject `..` and absolute components so requests stay inside the bundle.
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        bail!("invalid asset path");
    }

    file_response(&Path::new(FRONTEND_DIR).join(relative))
}

pub fn file_response(path: &Path) -> Result<Response<File>> {
    let file = File::open(path).with_context(|| format!("could not open {}", path.display()))?;
    let content_type = from_path(path).first_or_octet_stream().to_string();
    let header = Header::from_bytes("content-type", content_type)
        .map_err(|_| Error::msg("Could not create header"))?;

    Ok(Response::from_file(file).with_header(header))
}
