// Upload ledger: an append-only, line-oriented record of every file the
// agent has pushed successfully. One line per upload:
//
//     2026-10-14T09:30:00+02:00 - /data/incoming/a.txt
//
// The path field holds the raw OS bytes of the path, with `\`, `\n` and
// `\r` escaped so every record stays on one line. Nothing else is trimmed
// or rewritten, so non-UTF-8 names and surrounding whitespace survive.
//
// The ledger only ever grows. Nothing here rewrites or compacts it.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Local, SecondsFormat};

use crate::error::{Result, UploadError};

/// Separator between the timestamp and the path in a ledger line.
const RECORD_SEPARATOR: &[u8] = b" - ";

/// Membership store consulted before every upload and appended after
/// every confirmed success.
pub trait Ledger {
    /// Returns whether `path` has already been uploaded.
    fn is_uploaded(&self, path: &Path) -> Result<bool>;

    /// Remember that `path` was uploaded.
    fn record(&self, path: &Path) -> Result<()>;
}

/// How a ledger line is compared against a candidate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// The path field of the record must equal the candidate path.
    #[default]
    Exact,
    /// Any line containing the candidate path counts as a hit. This also
    /// matches `/data/a.txt` inside `/data/a.txt.bak` or `/other/data/a.txt`.
    Substring,
}

impl MatchMode {
    fn matches(self, line: &[u8], needle: &[u8]) -> bool {
        match self {
            MatchMode::Substring => contains(line, needle),
            MatchMode::Exact => {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                find(line, RECORD_SEPARATOR)
                    .is_some_and(|at| &line[at + RECORD_SEPARATOR.len()..] == needle)
            }
        }
    }
}

impl FromStr for MatchMode {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(MatchMode::Exact),
            "substring" => Ok(MatchMode::Substring),
            other => Err(UploadError::Config(format!(
                "unknown match mode '{}' (expected 'exact' or 'substring')",
                other
            ))),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    find(haystack, needle).is_some()
}

/// Path field as stored in a record.
fn encode_path(path: &Path) -> Vec<u8> {
    let raw = path.as_os_str().as_encoded_bytes();
    let mut encoded = Vec::with_capacity(raw.len());
    for &byte in raw {
        match byte {
            b'\\' => encoded.extend_from_slice(b"\\\\"),
            b'\n' => encoded.extend_from_slice(b"\\n"),
            b'\r' => encoded.extend_from_slice(b"\\r"),
            other => encoded.push(other),
        }
    }
    encoded
}

/// Ledger persisted as a plain text file, one record per line.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    mode: MatchMode,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>, mode: MatchMode) -> Self {
        FileLedger {
            path: path.into(),
            mode,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Format the line appended for `path` at the current local time.
    fn entry(path: &Path) -> Vec<u8> {
        let stamp = Local::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut line = stamp.into_bytes();
        line.extend_from_slice(RECORD_SEPARATOR);
        line.extend_from_slice(&encode_path(path));
        line.push(b'\n');
        line
    }
}

impl Ledger for FileLedger {
    fn is_uploaded(&self, path: &Path) -> Result<bool> {
        let contents = match fs::read(&self.path) {
            Ok(contents) => contents,
            // No ledger yet: nothing has been uploaded.
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(UploadError::ledger(&self.path, e)),
        };

        let needle = encode_path(path);
        Ok(contents
            .split(|&byte| byte == b'\n')
            .any(|line| self.mode.matches(line, &needle)))
    }

    fn record(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| UploadError::ledger(&self.path, e))?;

        file.write_all(&Self::entry(path))
            .map_err(|e| UploadError::ledger(&self.path, e))
    }
}
