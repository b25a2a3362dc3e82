//! # contract: the remote Sharepoint site as seen by the orchestrator
//!
//! This module defines a single trait ([`SiteClient`]) and the plain data it
//! exchanges: the authenticated [`Session`], where files go ([`Destination`]),
//! and what the server reports back ([`SiteInfo`], [`FolderInfo`],
//! [`UploadedFile`]).
//!
//! ## Interface
//! - The session is produced once by [`SiteClient::acquire_token`] and passed
//!   to every later call.
//! - Every failure is a [`RemoteError`] carrying the server-supplied message,
//!   which is what the user gets to see.
//! - Each method is attempted exactly once by callers; implementors must not
//!   retry either.
//!
//! ## Mocking & Testing
//! The trait is annotated for `mockall`; `MockSiteClient` is exported with the
//! default `test-export-mocks` feature so the binary crate's tests can use it too.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use serde::Serialize;
use thiserror::Error;

use crate::progress::UploadProgress;

/// Title of the document library folders and files are created in.
pub const DOCUMENT_LIBRARY: &str = "Documents";

/// A failed remote request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    /// HTTP status, when the request got as far as a response.
    pub status: Option<u16>,
    /// Human-readable message, from the server when it sent one.
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: None,
            message: message.into(),
        }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            message: message.into(),
        }
    }
}

/// An authenticated target URL.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub url: String,
    pub access_token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("url", &self.url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Where uploaded files are placed: a document library and optionally a folder in its root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub library: String,
    pub folder: Option<String>,
}

impl Destination {
    pub fn documents(folder: Option<&str>) -> Self {
        Self {
            library: DOCUMENT_LIBRARY.to_string(),
            folder: folder.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteInfo {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderInfo {
    pub server_relative_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedFile {
    pub name: String,
    pub server_relative_url: String,
}

/// Operations spuppy needs from a Sharepoint site.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait SiteClient: Send + Sync {
    /// Acquire an app-only access token scoped to `url` (site or site/subsite).
    async fn acquire_token(&self, url: &str) -> Result<Session, RemoteError>;

    /// Fetch title and canonical URL of the session's site.
    async fn site_info(&self, session: &Session) -> Result<SiteInfo, RemoteError>;

    /// Create `folder` in the root of the document library titled `library`.
    async fn create_folder(
        &self,
        session: &Session,
        library: &str,
        folder: &str,
    ) -> Result<FolderInfo, RemoteError>;

    /// Upload the local file at `path` into `destination`, `chunk_size` bytes
    /// per request, advancing `progress` as bytes are sent.
    async fn upload_file(
        &self,
        session: &Session,
        destination: &Destination,
        path: &Path,
        chunk_size: u64,
        progress: &UploadProgress,
    ) -> Result<UploadedFile, RemoteError>;
}
