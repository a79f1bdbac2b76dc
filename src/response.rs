//! Response writers.
//!
//! Handlers never return a response; they write one. Two writers matter:
//!
//! - [`Response`] is the raw, buffered writer the server hands to a pipeline.
//!   The server turns it into a hyper response once the chain returns.
//! - [`ResponseRecorder`] decorates whatever writer it is given and remembers
//!   the status and byte count, so after-phase middleware (the logger) can
//!   read them once `next` returns.
//!
//! Both implement [`ResponseWriter`], which extends [`std::io::Write`] so the
//! usual `write!` family works on any of them.

use std::io::{self, Write};

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use http::StatusCode;
use http_body_util::Full;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseWriter::content_type`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContentType {
    Css,          // text/css; charset=utf-8
    Csv,          // text/csv
    Html,         // text/html; charset=utf-8
    JavaScript,   // text/javascript; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream  (binary / file download)
    Pdf,          // application/pdf
    Png,          // image/png
    Svg,          // image/svg+xml
    Text,         // text/plain; charset=utf-8
    Xml,          // application/xml
}

impl ContentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Css         => "text/css; charset=utf-8",
            Self::Csv         => "text/csv",
            Self::Html        => "text/html; charset=utf-8",
            Self::JavaScript  => "text/javascript; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::Pdf         => "application/pdf",
            Self::Png         => "image/png",
            Self::Svg         => "image/svg+xml",
            Self::Text        => "text/plain; charset=utf-8",
            Self::Xml         => "application/xml",
        }
    }

    /// Guesses a content type from a file extension (case-insensitive).
    /// Unknown extensions map to `OctetStream`.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "css"          => Self::Css,
            "csv"          => Self::Csv,
            "htm" | "html" => Self::Html,
            "js" | "mjs"   => Self::JavaScript,
            "json"         => Self::Json,
            "pdf"          => Self::Pdf,
            "png"          => Self::Png,
            "svg"          => Self::Svg,
            "txt"          => Self::Text,
            "xml"          => Self::Xml,
            _              => Self::OctetStream,
        }
    }
}

// ── ResponseWriter ────────────────────────────────────────────────────────────

/// The writer every handler receives.
///
/// Headers must be set before the first call to [`write_header`] or
/// [`io::Write::write`]; the first status written is the one sent.
///
/// [`write_header`]: ResponseWriter::write_header
pub trait ResponseWriter: io::Write {
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line. Only the first call has an effect.
    fn write_header(&mut self, status: StatusCode);

    /// The status already sent, if any. Writers that cannot tell return
    /// `None`.
    fn sent_status(&self) -> Option<StatusCode> {
        None
    }

    /// Sets the `content-type` header.
    fn content_type(&mut self, content_type: ContentType) {
        self.headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type.as_str()));
    }
}

// ── Response ──────────────────────────────────────────────────────────────────

/// A buffered response, the raw writer at the bottom of every pipeline.
///
/// A body write without an explicit status implies `200 OK`. A second
/// [`write_header`](ResponseWriter::write_header) is ignored and logged.
///
/// ```rust
/// use std::io::Write;
/// use strand::{Response, ResponseWriter};
/// use http::StatusCode;
///
/// let mut res = Response::new();
/// res.write_header(StatusCode::CREATED);
/// res.write_all(b"made").unwrap();
/// res.write_header(StatusCode::OK); // ignored
///
/// assert_eq!(res.status(), StatusCode::CREATED);
/// assert_eq!(res.body(), b"made");
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    /// The status that will be sent. `200 OK` if nothing set one.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// `true` once a status or any body bytes have been written.
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let status = self.status();
        let mut res = http::Response::new(Full::new(Bytes::from(self.body)));
        *res.status_mut() = status;
        *res.headers_mut() = self.headers;
        res
    }
}

impl io::Write for Response {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ResponseWriter for Response {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(sent) => {
                tracing::warn!(%sent, ignored = %status, "superfluous write_header call");
            }
        }
    }

    fn sent_status(&self) -> Option<StatusCode> {
        self.status
    }
}

// ── ResponseRecorder ──────────────────────────────────────────────────────────

/// Decorates a [`ResponseWriter`] and records what passes through it.
///
/// Every pipeline wraps its incoming writer in a recorder before running the
/// chain, so handlers can inspect [`status`](Self::status) and
/// [`size`](Self::size) after `next` returns. The recorder never alters what
/// is written.
///
/// A recorder wrapping a writer that already has a status starts out with
/// that status, so an inner pipeline reports what the client will receive.
pub struct ResponseRecorder<'a> {
    inner: &'a mut dyn ResponseWriter,
    status: Option<StatusCode>,
    size: usize,
}

impl<'a> ResponseRecorder<'a> {
    pub fn new(inner: &'a mut dyn ResponseWriter) -> Self {
        let status = inner.sent_status();
        Self { inner, status, size: 0 }
    }

    /// The status sent on the wrapped writer, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// `true` once a status has been sent.
    pub fn written(&self) -> bool {
        self.status.is_some()
    }

    /// Body bytes written through this recorder.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl io::Write for ResponseRecorder<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.write_header(StatusCode::OK);
        }
        let n = self.inner.write(buf)?;
        self.size += n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl ResponseWriter for ResponseRecorder<'_> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        if self.status.is_none() {
            self.status = Some(status);
        }
        self.inner.write_header(status);
    }

    fn sent_status(&self) -> Option<StatusCode> {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn body_write_implies_ok() {
        let mut res = Response::new();
        assert!(!res.written());
        write!(res, "hi").unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.written());
    }

    #[test]
    fn recorder_tracks_status_and_size() {
        let mut res = Response::new();
        {
            let mut rec = ResponseRecorder::new(&mut res);
            assert_eq!(rec.status(), None);
            rec.content_type(ContentType::Text);
            rec.write_header(StatusCode::NOT_FOUND);
            rec.write_all(b"missing").unwrap();
            assert_eq!(rec.status(), Some(StatusCode::NOT_FOUND));
            assert_eq!(rec.size(), 7);
        }
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), b"missing");
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain; charset=utf-8");
    }

    #[test]
    fn nested_recorders_agree() {
        let mut res = Response::new();
        let mut outer = ResponseRecorder::new(&mut res);
        {
            let mut inner = ResponseRecorder::new(&mut outer);
            inner.write_all(b"abc").unwrap();
            assert_eq!(inner.status(), Some(StatusCode::OK));
        }
        assert_eq!(outer.status(), Some(StatusCode::OK));
        assert_eq!(outer.size(), 3);
    }

    #[test]
    fn recorder_starts_from_the_status_already_sent() {
        let mut res = Response::new();
        res.write_header(StatusCode::GONE);
        {
            let mut rec = ResponseRecorder::new(&mut res);
            assert_eq!(rec.status(), Some(StatusCode::GONE));
            assert!(rec.written());
            rec.write_all(b"gone").unwrap();
            assert_eq!(rec.status(), Some(StatusCode::GONE));
            assert_eq!(rec.size(), 4);
        }
        assert_eq!(res.status(), StatusCode::GONE);
        assert_eq!(res.body(), b"gone");
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(ContentType::from_extension("HTML"), ContentType::Html);
        assert_eq!(ContentType::from_extension("bin"), ContentType::OctetStream);
    }

    #[test]
    fn converts_into_http_response() {
        let mut res = Response::new();
        res.write_header(StatusCode::ACCEPTED);
        let res = res.into_inner();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }
}
