use std::path::{Path, PathBuf};

use url::Url;

const DEFAULT_FILENAME: &str = "index.html";

/// Derive an output filename from the last path segment of `url`.
///
/// Falls back to `index.html` when the path is empty or ends in `/`.
pub fn get_filename_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty());

    match segment {
        Some(raw) => {
            let decoded = urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            // A decoded segment may smuggle in separators; keep only the last part.
            let name = decoded
                .rsplit(|c: char| c == '/' || c == '\\')
                .next()
                .unwrap_or_default()
                .to_string();
            if name.is_empty() || name == "." || name == ".." {
                DEFAULT_FILENAME.to_string()
            } else {
                name
            }
        }
        None => DEFAULT_FILENAME.to_string(),
    }
}

/// The explicit `output` when given, otherwise a name derived from `url`.
pub fn resolve_target(url: &Url, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(get_filename_from_url(url)),
    }
}
