//! Static file lookup for the dispatcher.
//!
//! A [`StaticFiles`] root is mounted at a URL prefix. Lookups decode the
//! request path, refuse anything that could leave the root (`..`, absolute
//! or drive components, backslashes, symlinks pointing outside) and only
//! ever read regular files.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::error::StaticError;

/// A file read from disk, ready to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    prefix: String,
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

impl StaticFiles {
    /// Mount `dir` at `/<last component of dir>`, so `assets` serves
    /// `/assets/app.css` from `assets/app.css`.
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        let root = dir.into();
        let prefix = root
            .file_name()
            .and_then(|n| n.to_str())
            .map(normalize_prefix)
            .unwrap_or_default();
        Self { root, prefix }
    }

    /// Mount `dir` at an explicit URL prefix (`"/"` for the site root)
    pub fn mounted<P: Into<PathBuf>>(prefix: &str, dir: P) -> Self {
        Self {
            root: dir.into(),
            prefix: normalize_prefix(prefix),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URL prefix, `"/"` when mounted at the root
    pub fn prefix(&self) -> &str {
        if self.prefix.is_empty() {
            "/"
        } else {
            &self.prefix
        }
    }

    /// MIME type by file extension
    pub fn content_type_for(path: &Path) -> &'static str {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => "text/html; charset=utf-8",
            "css" => "text/css; charset=utf-8",
            "js" | "mjs" => "application/javascript; charset=utf-8",
            "json" => "application/json",
            "txt" => "text/plain; charset=utf-8",
            "svg" => "image/svg+xml",
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "gif" => "image/gif",
            "ico" => "image/x-icon",
            "wasm" => "application/wasm",
            "xml" => "application/xml",
            "pdf" => "application/pdf",
            "woff" => "font/woff",
            "woff2" => "font/woff2",
            _ => "application/octet-stream",
        }
    }

    /// Map a URL path to a file under the root without touching the disk.
    fn map_path(&self, url_path: &str) -> Result<PathBuf, StaticError> {
        let escape = || StaticError::PathEscape {
            path: url_path.to_string(),
        };
        let decoded = urlencoding::decode(url_path).map_err(|_| StaticError::NotFound)?;
        if decoded.contains(['\\', '\0']) {
            return Err(escape());
        }

        let rest = decoded
            .strip_prefix(self.prefix.as_str())
            .filter(|r| r.is_empty() || r.starts_with('/'))
            .ok_or(StaticError::NotFound)?;

        let mut path = self.root.clone();
        let mut segments = 0usize;
        for segment in rest.split('/') {
            match segment {
                "" | "." => continue,
                ".." => return Err(escape()),
                _ => {}
            }
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) => path.push(part),
                _ => return Err(escape()),
            }
            segments += 1;
        }
        if segments == 0 || rest.ends_with('/') {
            path.push("index.html");
        }
        Ok(path)
    }

    /// Resolve a URL path to an existing regular file inside the root.
    ///
    /// # Errors
    ///
    /// [`StaticError::PathEscape`] when the path tries to leave the root,
    /// [`StaticError::NotFound`] when nothing servable exists there.
    pub fn resolve(&self, url_path: &str) -> Result<PathBuf, StaticError> {
        let candidate = self.map_path(url_path)?;
        let canonical = fs::canonicalize(&candidate)?;
        let root = fs::canonicalize(&self.root)?;
        if !canonical.starts_with(&root) {
            return Err(StaticError::PathEscape {
                path: url_path.to_string(),
            });
        }
        if !fs::metadata(&canonical)?.is_file() {
            return Err(StaticError::NotFound);
        }
        Ok(canonical)
    }

    /// Read the file for `url_path`.
    ///
    /// # Errors
    ///
    /// Same as [`StaticFiles::resolve`], plus [`StaticError::Io`] when the
    /// read itself fails.
    pub fn load(&self, url_path: &str) -> Result<StaticFile, StaticError> {
        let path = match self.resolve(url_path) {
            Ok(path) => path,
            Err(e @ StaticError::PathEscape { .. }) => {
                warn!(url_path = %url_path, root = %self.root.display(), "Static path escape rejected");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let bytes = fs::read(&path)?;
        let content_type = Self::content_type_for(&path);
        debug!(
            url_path = %url_path,
            file = %path.display(),
            size_bytes = bytes.len(),
            content_type = content_type,
            "Static file loaded"
        );
        Ok(StaticFile {
            path,
            bytes,
            content_type,
        })
    }
}
