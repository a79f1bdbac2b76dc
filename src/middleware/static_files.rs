use std::io::Write;
use std::path::{Path, PathBuf};

use http::header::{CONTENT_LENGTH, HeaderValue};
use http::{Method, StatusCode};
use tracing::trace;

use crate::chain::Next;
use crate::context::Context;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{ContentType, ResponseRecorder, ResponseWriter};

/// Serves files from a directory, delegating anything it cannot serve.
///
/// Only `GET` and `HEAD` are considered. A request is delegated unchanged if
/// its path is outside [`prefix`](Self::prefix), contains a `..` segment, or
/// names no readable file. A directory is served through its
/// [`index`](Self::index) file.
#[derive(Clone, Debug)]
pub struct Static {
    dir: PathBuf,
    prefix: String,
    index: String,
}

impl Static {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::new(),
            index: "index.html".to_owned(),
        }
    }

    /// Only serve paths under `prefix` (e.g. `"/assets"`), stripping it
    /// before the file lookup.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_owned();
        self
    }

    /// File served for directory paths. Defaults to `index.html`.
    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let rel = path.strip_prefix(self.prefix.as_str())?;
        if !(rel.is_empty() || rel.starts_with('/')) {
            return None;
        }

        let mut file = self.dir.clone();
        for segment in rel.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." || segment == "." || segment.contains('\\') {
                return None;
            }
            file.push(segment);
        }

        if file.is_dir() {
            file.push(&self.index);
        }
        file.is_file().then_some(file)
    }
}

impl Handler for Static {
    fn serve(&self, ctx: Context, rw: &mut ResponseRecorder<'_>, req: &Request, next: Next<'_>) {
        let method = req.method();
        if method != Method::GET && method != Method::HEAD {
            return next.run(ctx, rw, req);
        }

        let Some(file) = self.resolve(req.path()) else {
            return next.run(ctx, rw, req);
        };
        let Ok(bytes) = std::fs::read(&file) else {
            return next.run(ctx, rw, req);
        };

        trace!(request = %req.id(), file = %file.display(), "serving static file");
        rw.content_type(content_type_of(&file));
        rw.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(bytes.len()));
        rw.write_header(StatusCode::OK);
        if method == Method::GET {
            let _ = rw.write_all(&bytes);
        }
    }
}

fn content_type_of(file: &Path) -> ContentType {
    file.extension()
        .and_then(|ext| ext.to_str())
        .map_or(ContentType::OctetStream, ContentType::from_extension)
}
