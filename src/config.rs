// Command-line flags and the immutable configuration built from them.
//
// `Args` is what clap parses; `Config` is what the rest of the agent sees.
// The conversion happens once at startup and validates the method and URL
// so that a typo fails fast instead of failing every upload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use tracing::warn;

use crate::error::{Result, UploadError};
use crate::ledger::MatchMode;
use crate::request::parse_body_fields;

/// Watch a directory tree and upload every file in it once.
#[derive(Parser, Debug, Clone)]
#[command(name = "upload-agent")]
#[command(about = "Upload every file under a directory to an HTTP endpoint, once")]
#[command(version)]
pub struct Args {
    /// Server URL for file upload
    #[arg(
        long,
        env = "UPLOAD_AGENT_SERVER_URL",
        default_value = "http://example.com/upload"
    )]
    pub server_url: String,

    /// Directory to watch for new files
    #[arg(
        long,
        env = "UPLOAD_AGENT_UPLOAD_DIR",
        default_value = "/path/to/upload/directory"
    )]
    pub upload_dir: PathBuf,

    /// Log file path
    #[arg(long, env = "UPLOAD_AGENT_LOG_FILE", default_value = "/path/to/logfile.log")]
    pub log_file: PathBuf,

    /// HTTP method for file upload
    #[arg(long, env = "UPLOAD_AGENT_METHOD", default_value = "POST")]
    pub method: String,

    /// Headers to include in the request, formatted as 'key1:value1,key2:value2'
    #[arg(long, env = "UPLOAD_AGENT_HEADERS", default_value = "")]
    pub headers: String,

    /// JSON object whose keys become extra multipart form fields
    #[arg(long, env = "UPLOAD_AGENT_BODY", default_value = "")]
    pub body: String,

    /// Ledger of uploaded files (defaults to `<log-file>.ledger`)
    #[arg(long, env = "UPLOAD_AGENT_LEDGER_FILE")]
    pub ledger_file: Option<PathBuf>,

    /// How ledger records are matched: exact or substring
    #[arg(long, env = "UPLOAD_AGENT_MATCH_MODE", default_value = "exact")]
    pub match_mode: MatchMode,

    /// Seconds to sleep between two scans
    #[arg(
        long,
        env = "UPLOAD_AGENT_INTERVAL_SECS",
        default_value_t = 1,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_secs: u64,

    /// Seconds before an upload request is abandoned
    #[arg(
        long,
        env = "UPLOAD_AGENT_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,
}

/// Upload parameters shared by every request of a process run.
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub server_url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    /// Raw JSON object text; parsed for each request.
    pub body: Option<String>,
}

impl RequestConfig {
    /// Build a request config from raw flag values.
    pub fn new(server_url: &str, method: &str, headers: &str, body: &str) -> Result<Self> {
        let server_url = Url::parse(server_url).map_err(|e| {
            UploadError::Config(format!("invalid server url '{}': {}", server_url, e))
        })?;
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| UploadError::Config(format!("invalid HTTP method '{}'", method)))?;
        let body = (!body.is_empty()).then(|| body.to_string());

        Ok(RequestConfig {
            server_url,
            method,
            headers: parse_headers(headers),
            body,
        })
    }
}

/// Everything the agent needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub upload_dir: PathBuf,
    pub log_file: PathBuf,
    pub ledger_file: PathBuf,
    pub match_mode: MatchMode,
    pub interval: Duration,
    pub timeout: Duration,
    pub request: RequestConfig,
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self> {
        let request = RequestConfig::new(&args.server_url, &args.method, &args.headers, &args.body)?;

        if let Some(body) = &request.body {
            if let Err(e) = parse_body_fields(body) {
                warn!("Body data is not a JSON object, every upload will fail: {}", e);
            }
        }

        let ledger_file = args
            .ledger_file
            .unwrap_or_else(|| default_ledger_path(&args.log_file));

        Ok(Config {
            upload_dir: args.upload_dir,
            log_file: args.log_file,
            ledger_file,
            match_mode: args.match_mode,
            interval: Duration::from_secs(args.interval_secs),
            timeout: Duration::from_secs(args.timeout_secs),
            request,
        })
    }
}

/// `<log-file>.ledger`, kept next to the operational log.
pub fn default_ledger_path(log_file: &Path) -> PathBuf {
    let mut name = OsString::from(log_file.as_os_str());
    name.push(".ledger");
    PathBuf::from(name)
}

/// Parse a `key1:value1,key2:value2` header list.
///
/// Pairs without a colon are skipped silently. Pairs that are not valid
/// HTTP header names or values are skipped with a warning. Repeated keys
/// keep every value.
pub fn parse_headers(raw: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if raw.is_empty() {
        return headers;
    }

    for pair in raw.split(',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                warn!("Skipping invalid header name: {:?}", key);
                continue;
            }
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => {
                warn!("Skipping invalid value for header {}", name);
                continue;
            }
        };
        headers.append(name, value);
    }

    headers
}
