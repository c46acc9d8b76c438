// Library root
// -----------
// The binary (`main.rs`) wires these modules into a polling upload agent.
//
// Module responsibilities:
// - `config`: CLI flags and the immutable configuration built from them.
// - `error`: the error enum shared by every module.
// - `ledger`: the append-only record of files already uploaded.
// - `request`: turns a file into a multipart upload request.
// - `uploader`: sends requests and runs the per-file pipeline.
// - `scanner`: candidate discovery and the fixed-interval poll loop.
pub mod config;
pub mod error;
pub mod ledger;
pub mod request;
pub mod scanner;
pub mod uploader;

pub use error::{Result, UploadError};
