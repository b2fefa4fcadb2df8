//! Multipart upload client
//!
//! Pushes needle bytes to a data node with a multipart form POST. The
//! server answers with a small JSON body; an `Error` field in that body is
//! a failure even when the HTTP status is 200.

use std::io::Read;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Result, StoreError};

/// Outcome of a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadResult {
    /// Bytes the server reports having stored
    pub size: usize,
}

/// Response body shape: `{"Size": n, "Error": "..."}`
#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(rename = "Size", default)]
    size: usize,
    #[serde(rename = "Error", default)]
    error: String,
}

/// Upload `data` to `url` as a multipart form POST
///
/// The form carries one part named `file` with the (escaped) filename. The
/// content type comes from `mime_type` when given, otherwise it is inferred
/// from the filename extension. `gzipped` adds `Content-Encoding: gzip` to
/// the part. Nothing is retried; any network, decode, or application-level
/// failure surfaces to the caller.
pub fn upload(
    url: &str,
    filename: &str,
    data: impl Read + Send + 'static,
    gzipped: bool,
    mime_type: Option<&str>,
) -> Result<UploadResult> {
    let mut part = Part::reader(data).file_name(escape_file_name(filename));

    let mime = match mime_type {
        Some(m) => Some(m.to_string()),
        None => mime_guess::from_path(filename)
            .first_raw()
            .map(str::to_string),
    };
    if let Some(mime) = mime {
        part = part.mime_str(&mime)?;
    }
    if gzipped {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        part = part.headers(headers);
    }

    // Filenames are escaped by hand above; keep reqwest from re-encoding.
    let form = Form::new().percent_encode_noop().part("file", part);

    debug!(url, filename, gzipped, "uploading");
    let response = reqwest::blocking::Client::new()
        .post(url)
        .multipart(form)
        .send()?;

    let body: UploadResponse = response.json()?;
    if !body.error.is_empty() {
        return Err(StoreError::UploadRejected(body.error));
    }
    Ok(UploadResult { size: body.size })
}

/// Backslash/quote escaping for the Content-Disposition filename
fn escape_file_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_quotes_and_backslashes() {
        assert_eq!(escape_file_name("plain.jpg"), "plain.jpg");
        assert_eq!(escape_file_name(r#"a"b.jpg"#), r#"a\"b.jpg"#);
        assert_eq!(escape_file_name(r"dir\file.jpg"), r"dir\\file.jpg");
    }

    #[test]
    fn response_error_field_defaults_to_empty() {
        let ok: UploadResponse = serde_json::from_str(r#"{"Size": 12}"#).unwrap();
        assert_eq!(ok.size, 12);
        assert!(ok.error.is_empty());

        let failed: UploadResponse =
            serde_json::from_str(r#"{"Size": 0, "Error": "volume full"}"#).unwrap();
        assert_eq!(failed.error, "volume full");
    }
}
