// Request builder: turns one file plus the shared RequestConfig into the
// pieces of a multipart/form-data upload. The result is plain data so it
// can be inspected before it becomes a reqwest form.

use std::fs;
use std::path::{Path, PathBuf};

use reqwest::blocking::multipart::{Form, Part};
use reqwest::header::HeaderMap;
use serde_json::{Map, Value};

use crate::config::RequestConfig;
use crate::error::{Result, UploadError};

/// Form field carrying the file payload.
pub const FILE_FIELD: &str = "file";

const FILE_MIME: &str = "application/octet-stream";

/// A fully prepared upload for a single file.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: PathBuf,
    pub file_name: String,
    pub payload: Vec<u8>,
    /// Extra text fields, in the order they are added to the form.
    pub fields: Vec<(String, String)>,
    /// Custom headers. `Content-Type` is added when the form is attached.
    pub headers: HeaderMap,
}

impl UploadRequest {
    /// Read `path` into memory and combine it with the configured extra
    /// fields and headers. Fails when the file cannot be read or when the
    /// configured body is not a JSON object.
    pub fn build(path: &Path, config: &RequestConfig) -> Result<Self> {
        let payload = fs::read(path).map_err(|e| UploadError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        let fields = match &config.body {
            Some(body) => parse_body_fields(body)?,
            None => Vec::new(),
        };

        Ok(UploadRequest {
            path: path.to_path_buf(),
            file_name,
            payload,
            fields,
            headers: config.headers.clone(),
        })
    }

    /// Multipart form with the file part first, then the extra fields.
    pub fn into_form(self) -> Result<Form> {
        let part = Part::bytes(self.payload)
            .file_name(self.file_name)
            .mime_str(FILE_MIME)?;
        Ok(self
            .fields
            .into_iter()
            .fold(Form::new().part(FILE_FIELD, part), |form, (key, value)| {
                form.text(key, value)
            }))
    }
}

/// Parse a JSON object into `(key, text)` pairs, one per top-level key.
///
/// Strings are used verbatim; every other value is written as its JSON
/// text, so `42` becomes `"42"` and `{"a":1}` stays `{"a":1}`.
pub fn parse_body_fields(body: &str) -> Result<Vec<(String, String)>> {
    let object: Map<String, Value> = serde_json::from_str(body)?;
    Ok(object
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}
