// Uploader: holds a blocking reqwest client and runs the per-file pipeline
// (ledger check, request build, send, record). Everything is synchronous;
// one file is fully dispositioned before the next one is looked at.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;
use tracing::{debug, error, info, trace};

use crate::config::RequestConfig;
use crate::error::Result;
use crate::ledger::Ledger;
use crate::request::UploadRequest;
use crate::scanner::UploadTask;

/// What the server said about one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Status was exactly 200.
    Accepted,
    /// Any other status, including other 2xx codes.
    Rejected(StatusCode),
}

/// Final state of one file within one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Already in the ledger; no request was made.
    Skipped,
    /// Uploaded and written to the ledger.
    Recorded,
    /// Uploaded, but the ledger append failed.
    Unrecorded,
    /// The server answered with a non-200 status.
    Rejected(StatusCode),
    /// The file could not be read, the body was malformed, or the request
    /// never got a response.
    Dropped,
}

/// Sends uploads with the shared request configuration and remembers
/// accepted ones in a ledger.
pub struct Uploader<L> {
    client: Client,
    config: RequestConfig,
    ledger: L,
}

impl<L: Ledger> Uploader<L> {
    /// Build the HTTP client with a whole-request `timeout`.
    pub fn new(config: RequestConfig, timeout: Duration, ledger: L) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Uploader {
            client,
            config,
            ledger,
        })
    }

    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Issue the request with the configured method and URL. Only a
    /// transport failure is an error; any HTTP status is an outcome.
    pub fn send(&self, request: UploadRequest) -> Result<SendOutcome> {
        let headers = request.headers.clone();
        let form = request.into_form()?;

        let response = self
            .client
            .request(self.config.method.clone(), self.config.server_url.clone())
            .multipart(form)
            .headers(headers)
            .send()?;

        let status = response.status();
        match response.text() {
            Ok(body) => debug!(%status, "Server response: {}", body),
            Err(e) => debug!(%status, "Could not read server response: {}", e),
        }

        if status == StatusCode::OK {
            Ok(SendOutcome::Accepted)
        } else {
            Ok(SendOutcome::Rejected(status))
        }
    }

    /// Run one discovered file through the pipeline. Never fails: every
    /// error is logged and folded into the returned disposition.
    pub fn process(&self, task: &UploadTask) -> Disposition {
        let path = task.path.as_path();

        match self.ledger.is_uploaded(path) {
            Ok(true) => {
                trace!("File already uploaded: {}", path.display());
                return Disposition::Skipped;
            }
            Ok(false) => {}
            // Fail open.
            Err(e) => error!("Error reading ledger, uploading {} anyway: {}", path.display(), e),
        }

        let request = match UploadRequest::build(path, &self.config) {
            Ok(request) => request,
            Err(e) => {
                error!("Error preparing upload for {}: {}", path.display(), e);
                return Disposition::Dropped;
            }
        };

        match self.send(request) {
            Ok(SendOutcome::Accepted) => {
                info!("File uploaded successfully: {}", path.display());
                match self.ledger.record(path) {
                    Ok(()) => Disposition::Recorded,
                    Err(e) => {
                        error!("Error recording upload of {}: {}", path.display(), e);
                        Disposition::Unrecorded
                    }
                }
            }
            Ok(SendOutcome::Rejected(status)) => {
                error!("Failed to upload file: {}, Status: {}", path.display(), status);
                Disposition::Rejected(status)
            }
            Err(e) => {
                error!("Error uploading file {}: {}", path.display(), e);
                Disposition::Dropped
            }
        }
    }
}
