use askama::Template;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Characters escaped in a single path segment of an href.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Clone)]
pub(crate) struct ListingState {
    root: Arc<PathBuf>,
}

impl ListingState {
    pub(crate) fn new(root: &Path) -> Self {
        Self {
            root: Arc::new(root.to_path_buf()),
        }
    }
}

#[derive(Template)]
#[template(path = "directory_listing.html")]
struct DirectoryListingTemplate {
    title: String,
    entries: Vec<ListingEntry>,
}

struct ListingEntry {
    name: String,
    href: String,
}

/// Answers for paths the file service could not serve: an index of the
/// directory when the path is one, 404 otherwise.
pub(crate) async fn list_directory(State(state): State<ListingState>, uri: Uri) -> Response {
    let Some(dir) = resolve_dir(&state.root, uri.path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let entries = match read_entries(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("failed to list {}: {err}", dir.display());
            return StatusCode::NOT_FOUND.into_response();
        }
    };

    let title = percent_decode_str(uri.path())
        .decode_utf8_lossy()
        .into_owned();
    match (DirectoryListingTemplate { title, entries }).render() {
        Ok(html) => Html(html).into_response(),
        Err(err) => {
            warn!("failed to render listing for {}: {err}", dir.display());
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub(crate) fn resolve_dir(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let mut dir = root.to_path_buf();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            segment if segment.contains('\\') => return None,
            segment => dir.push(segment),
        }
    }
    dir.is_dir().then_some(dir)
}

fn read_entries(dir: &Path) -> std::io::Result<Vec<ListingEntry>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let href = utf8_percent_encode(&name, SEGMENT).to_string();
        if entry.path().is_dir() {
            entries.push(ListingEntry {
                name: format!("{name}/"),
                href: format!("{href}/"),
            });
        } else {
            entries.push(ListingEntry { name, href });
        }
    }
    entries.sort_by_key(|entry| entry.name.to_lowercase());
    Ok(entries)
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;

    #[test]
    fn resolve_dir__should_reject_parent_segments() {
        // Given
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(root.path().join("assets")).expect("create dir");

        // Then
        assert!(resolve_dir(root.path(), "/assets/../../").is_none());
        assert!(resolve_dir(root.path(), "/%2E%2E/").is_none());
    }

    #[test]
    fn resolve_dir__should_decode_segments() {
        // Given
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(root.path().join("my files")).expect("create dir");

        // When
        let dir = resolve_dir(root.path(), "/my%20files/").expect("directory");

        // Then
        assert_eq!(dir, root.path().join("my files"));
        assert!(resolve_dir(root.path(), "/missing/").is_none());
    }

    #[test]
    fn read_entries__should_sort_and_mark_directories() {
        // Given
        let root = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(root.path().join("Zeta")).expect("create dir");
        std::fs::write(root.path().join("alpha beta.js"), "").expect("write file");

        // When
        let entries = read_entries(root.path()).expect("entries");

        // Then
        let rendered: Vec<(&str, &str)> = entries
            .iter()
            .map(|entry| (entry.name.as_str(), entry.href.as_str()))
            .collect();
        assert_eq!(rendered, [("alpha beta.js", "alpha%20beta.js"), ("Zeta/", "Zeta/")]);
    }
}
