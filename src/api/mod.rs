//! Client side of the bulletin HTTP API.

pub mod client;
pub mod error;
pub mod parser;
pub mod traits;

pub use client::HttpApi;
pub use error::ApiError;
pub use traits::BulletinApi;

/// Acknowledgement of an accepted re-run request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RerunReceipt {
    pub message: String,
}

/// A produced artifact and the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDownload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}
