//! High-level pipeline: validate → authenticate → verify site → ensure folder → upload.
//!
//! [`upload`] runs the stages of one spuppy invocation in strict order. Each
//! stage either succeeds and hands its result to the next, or reports to the
//! user through the [`Logger`] and returns the matching [`UploadError`]
//! variant, ending the run.
//!
//! # Responsibilities
//! - No network call happens before the request has validated.
//! - Every remote call is made once; nothing is retried.
//! - Files are uploaded one after another; the first failure skips the rest.
//! - Side effects of earlier stages (a created folder, files already uploaded)
//!   are left in place when a later stage fails.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::{RuntimeSettings, SiteCredentials};
use crate::contract::{
    Destination, FolderInfo, RemoteError, Session, SiteClient, SiteInfo, UploadedFile,
    DOCUMENT_LIBRARY,
};
use crate::logging::Logger;
use crate::progress::UploadProgress;
use crate::request::{UploadRequest, ValidationError};

/// The stage a run stopped at, and why.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload request is invalid ({} problem(s))", .0.len())]
    Validation(Vec<ValidationError>),
    #[error("authentication against {url} failed")]
    Authentication {
        url: String,
        #[source]
        source: RemoteError,
    },
    #[error("site {url} could not be verified")]
    Site {
        url: String,
        #[source]
        source: RemoteError,
    },
    #[error("folder {folder} could not be created")]
    Folder {
        folder: String,
        #[source]
        source: RemoteError,
    },
    #[error("upload of {} failed", .file.display())]
    Upload {
        file: PathBuf,
        #[source]
        source: RemoteError,
    },
    #[error("cannot read {}", .path.display())]
    Unexpected {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// What a successful run did on the server.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub site: SiteInfo,
    pub folder: Option<FolderInfo>,
    pub files: Vec<UploadedFile>,
}

/// Runs every stage of an upload against `client`.
pub async fn upload<C>(
    client: &C,
    credentials: &SiteCredentials,
    runtime: &RuntimeSettings,
    mut request: UploadRequest,
    logger: &Logger,
) -> Result<UploadReport, UploadError>
where
    C: SiteClient + ?Sized,
{
    logger.debug(format_args!("{credentials:?}"));
    logger.debug(format_args!("{runtime:?}"));
    logger.debug(format_args!("{request:?}"));

    if let Err(errors) = request.verify() {
        for error in &errors {
            logger.error(error);
        }
        return Err(UploadError::Validation(errors));
    }
    logger.debug(format_args!("{request:?}"));

    let url = credentials.target_url();
    logger.debug(&url);
    let session = match client.acquire_token(&url).await {
        Ok(session) => session,
        Err(source) => {
            let err = UploadError::Authentication { url, source };
            logger.exception(&err);
            return Err(err);
        }
    };
    logger.debug(format_args!("{session:?}"));

    let site = verify_site(client, &session, logger).await?;

    let folder = match request.out_folder() {
        Some(name) => Some(ensure_folder(client, &session, name, logger).await?),
        None => None,
    };

    let destination = Destination::documents(request.out_folder());
    let mut files = Vec::with_capacity(request.files().len());
    for path in request.files() {
        let uploaded =
            upload_one(client, &session, &destination, path, runtime.chunk_size(), logger).await?;
        files.push(uploaded);
    }

    Ok(UploadReport {
        site,
        folder,
        files,
    })
}

async fn verify_site<C>(client: &C, session: &Session, logger: &Logger) -> Result<SiteInfo, UploadError>
where
    C: SiteClient + ?Sized,
{
    match client.site_info(session).await {
        Ok(site) => {
            logger.success(format_args!("Site {}: {}", site.title, site.url));
            Ok(site)
        }
        Err(source) => {
            logger.error(&source.message);
            Err(UploadError::Site {
                url: session.url.clone(),
                source,
            })
        }
    }
}

async fn ensure_folder<C>(
    client: &C,
    session: &Session,
    name: &str,
    logger: &Logger,
) -> Result<FolderInfo, UploadError>
where
    C: SiteClient + ?Sized,
{
    match client.create_folder(session, DOCUMENT_LIBRARY, name).await {
        Ok(folder) => {
            logger.success(format_args!("Added folder: {}", folder.server_relative_url));
            Ok(folder)
        }
        Err(source) => {
            logger.error(&source.message);
            Err(UploadError::Folder {
                folder: name.to_string(),
                source,
            })
        }
    }
}

async fn upload_one<C>(
    client: &C,
    session: &Session,
    destination: &Destination,
    path: &Path,
    chunk_size: u64,
    logger: &Logger,
) -> Result<UploadedFile, UploadError>
where
    C: SiteClient + ?Sized,
{
    let basename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    logger.info(format_args!("File upload: {basename}"));

    let size = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata.len(),
        Err(source) => {
            let err = UploadError::Unexpected {
                path: path.to_path_buf(),
                source,
            };
            logger.exception(&err);
            return Err(err);
        }
    };

    let progress = UploadProgress::new(size);
    let result = client
        .upload_file(session, destination, path, chunk_size, &progress)
        .await;

    match result {
        Ok(uploaded) => {
            progress.finish();
            drop(progress);
            logger.success(format_args!(
                "File {} uploaded to: {}",
                path.display(),
                uploaded.server_relative_url
            ));
            Ok(uploaded)
        }
        Err(source) => {
            drop(progress);
            logger.error(&source.message);
            Err(UploadError::Upload {
                file: path.to_path_buf(),
                source,
            })
        }
    }
}
