#![doc = "Sharepoint REST client: the concrete `SiteClient` used by the CLI."]
//
//! # Sharepoint client (CLI <-> Core)
//!
//! [`SharepointClient`] implements [`SiteClient`] from `spuppy-core` against the
//! Sharepoint REST API using reqwest.
//!
//! - Tokens come from the Azure ACS client-credential flow, scoped to the host
//!   of the target site.
//! - Site, folder and file calls go to `<site>/_api/...` with
//!   `Accept: application/json;odata=nometadata`.
//! - Files up to one chunk are sent with a single `Files/add`; larger files are
//!   streamed with `StartUpload`, `ContinueUpload` and `FinishUpload`.
//!
//! Server error bodies are reduced to their human-readable message, which is
//! what ends up in front of the user.

use std::path::Path;

use async_trait::async_trait;
use reqwest::{header, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use spuppy_core::config::SiteCredentials;
use spuppy_core::contract::{
    Destination, FolderInfo, RemoteError, Session, SiteClient, SiteInfo, UploadedFile,
};
use spuppy_core::progress::UploadProgress;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use uuid::Uuid;

/// Default Azure ACS endpoint issuing app-only Sharepoint tokens.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://accounts.accesscontrol.windows.net";

/// Well-known principal id of Sharepoint Online.
const SHAREPOINT_PRINCIPAL: &str = "00000003-0000-0ff1-ce00-000000000000";

const ODATA_JSON: &str = "application/json;odata=nometadata";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WebResponse {
    title: String,
    url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FolderResponse {
    server_relative_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileResponse {
    name: String,
    server_relative_url: String,
}

impl From<FileResponse> for UploadedFile {
    fn from(file: FileResponse) -> Self {
        UploadedFile {
            name: file.name,
            server_relative_url: file.server_relative_url,
        }
    }
}

pub struct SharepointClient {
    http: reqwest::Client,
    tenant: String,
    client_id: String,
    client_secret: String,
    token_endpoint: String,
}

impl SharepointClient {
    pub fn new(credentials: &SiteCredentials) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder().build().map_err(|e| {
            tracing::error!(error = ?e, "Failed to create HTTP client");
            RemoteError::new(format!("Failed to create HTTP client: {e}"))
        })?;
        tracing::info!(
            tenant = credentials.tenant(),
            client = credentials.client(),
            "Initialized SharepointClient"
        );
        Ok(Self {
            http,
            tenant: credentials.tenant().to_string(),
            client_id: credentials.client().to_string(),
            client_secret: credentials.secret().to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        })
    }

    /// Sends token requests to `endpoint` instead of Azure ACS.
    pub fn with_token_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.token_endpoint = endpoint.into();
        self
    }

    fn request(&self, method: Method, session: &Session, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(&session.access_token)
            .header(header::ACCEPT, ODATA_JSON)
    }

    fn folder_url(session: &Session, destination: &Destination) -> String {
        let mut url = format!(
            "{}/_api/web/lists/GetByTitle('{}')/RootFolder",
            session.url,
            quote(&destination.library)
        );
        if let Some(folder) = &destination.folder {
            url.push_str(&format!("/Folders/GetByUrl('{}')", quote(folder)));
        }
        url
    }

    /// Sends one chunk of an upload session addressed by the file's server-relative URL.
    async fn send_chunk<T: DeserializeOwned>(
        &self,
        session: &Session,
        server_relative_url: &str,
        operation: &str,
        chunk: Vec<u8>,
    ) -> Result<T, RemoteError> {
        let url = format!(
            "{}/_api/web/GetFileByServerRelativeUrl(@u)/{operation}",
            session.url
        );
        let alias = format!("'{}'", server_relative_url.replace('\'', "''"));
        let response = self
            .request(Method::POST, session, &url)
            .query(&[("@u", alias)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(chunk)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}

#[async_trait]
impl SiteClient for SharepointClient {
    async fn acquire_token(&self, url: &str) -> Result<Session, RemoteError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| RemoteError::new(format!("Invalid site URL {url}: {e}")))?;
        let host = parsed
            .host_str()
            .ok_or_else(|| RemoteError::new(format!("Site URL {url} has no host")))?;

        let endpoint = format!(
            "{}/{}/tokens/OAuth/2",
            self.token_endpoint.trim_end_matches('/'),
            self.tenant
        );
        let form = [
            ("grant_type", "client_credentials".to_string()),
            ("client_id", format!("{}@{}", self.client_id, self.tenant)),
            ("client_secret", self.client_secret.clone()),
            (
                "resource",
                format!("{SHAREPOINT_PRINCIPAL}/{host}@{}", self.tenant),
            ),
        ];
        tracing::info!(url, host, "Requesting app-only access token");

        let response = self
            .http
            .post(&endpoint)
            .form(&form)
            .send()
            .await
            .map_err(transport_error)?;
        let token: TokenResponse = read_json(response).await?;

        Ok(Session {
            url: url.trim_end_matches('/').to_string(),
            access_token: token.access_token,
        })
    }

    async fn site_info(&self, session: &Session) -> Result<SiteInfo, RemoteError> {
        let url = format!("{}/_api/web", session.url);
        tracing::debug!(url = %url, "Fetching site metadata");
        let response = self
            .request(Method::GET, session, &url)
            .send()
            .await
            .map_err(transport_error)?;
        let web: WebResponse = read_json(response).await?;
        Ok(SiteInfo {
            title: web.title,
            url: web.url,
        })
    }

    async fn create_folder(
        &self,
        session: &Session,
        library: &str,
        folder: &str,
    ) -> Result<FolderInfo, RemoteError> {
        let url = format!(
            "{}/_api/web/lists/GetByTitle('{}')/RootFolder/Folders/add(url='{}')",
            session.url,
            quote(library),
            quote(folder)
        );
        tracing::info!(library, folder, "Creating folder");
        let response = self
            .request(Method::POST, session, &url)
            .send()
            .await
            .map_err(transport_error)?;
        let created: FolderResponse = read_json(response).await?;
        Ok(FolderInfo {
            server_relative_url: created.server_relative_url,
        })
    }

    async fn upload_file(
        &self,
        session: &Session,
        destination: &Destination,
        path: &Path,
        chunk_size: u64,
        progress: &UploadProgress,
    ) -> Result<UploadedFile, RemoteError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| RemoteError::new(format!("{} has no file name", path.display())))?;
        let mut file = File::open(path).await.map_err(|e| local_error(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| local_error(path, e))?
            .len();

        let add_url = format!(
            "{}/Files/add(url='{}',overwrite=true)",
            Self::folder_url(session, destination),
            quote(&name)
        );
        tracing::info!(file = %path.display(), size, chunk_size, "Uploading file");

        if size <= chunk_size {
            let mut content = Vec::new();
            file.read_to_end(&mut content)
                .await
                .map_err(|e| local_error(path, e))?;
            let sent = content.len() as u64;
            let response = self
                .request(Method::POST, session, &add_url)
                .header(header::CONTENT_TYPE, "application/octet-stream")
                .body(content)
                .send()
                .await
                .map_err(transport_error)?;
            let created: FileResponse = read_json(response).await?;
            progress.advance(sent);
            return Ok(created.into());
        }

        // Large files: create an empty file, then stream it in an upload session.
        let response = self
            .request(Method::POST, session, &add_url)
            .body(Vec::new())
            .send()
            .await
            .map_err(transport_error)?;
        let created: FileResponse = read_json(response).await?;
        let upload_id = Uuid::new_v4();
        let mut offset = 0u64;

        loop {
            let chunk = read_chunk(&mut file, chunk_size.min(size - offset))
                .await
                .map_err(|e| local_error(path, e))?;
            if chunk.is_empty() {
                return Err(RemoteError::new(format!(
                    "{} ended after {offset} of {size} bytes",
                    path.display()
                )));
            }
            let len = chunk.len() as u64;

            if offset == 0 {
                let _: Value = self
                    .send_chunk(
                        session,
                        &created.server_relative_url,
                        &format!("StartUpload(uploadId=guid'{upload_id}')"),
                        chunk,
                    )
                    .await?;
            } else if offset + len >= size {
                let finished: FileResponse = self
                    .send_chunk(
                        session,
                        &created.server_relative_url,
                        &format!("FinishUpload(uploadId=guid'{upload_id}',fileOffset={offset})"),
                        chunk,
                    )
                    .await?;
                progress.advance(len);
                tracing::debug!(file = %path.display(), size, "Finished upload session");
                return Ok(finished.into());
            } else {
                let _: Value = self
                    .send_chunk(
                        session,
                        &created.server_relative_url,
                        &format!("ContinueUpload(uploadId=guid'{upload_id}',fileOffset={offset})"),
                        chunk,
                    )
                    .await?;
            }

            progress.advance(len);
            offset += len;
            tracing::debug!(file = %path.display(), offset, size, "Uploaded chunk");
        }
    }
}

async fn read_chunk(file: &mut File, limit: u64) -> std::io::Result<Vec<u8>> {
    let mut chunk = Vec::new();
    (&mut *file).take(limit).read_to_end(&mut chunk).await?;
    Ok(chunk)
}

/// Escapes a value for a single-quoted REST path parameter.
fn quote(value: &str) -> String {
    urlencoding::encode(&value.replace('\'', "''")).into_owned()
}

fn transport_error(e: reqwest::Error) -> RemoteError {
    tracing::error!(error = ?e, "Sharepoint request failed to complete");
    RemoteError {
        status: e.status().map(|s| s.as_u16()),
        message: e.to_string(),
    }
}

fn local_error(path: &Path, e: std::io::Error) -> RemoteError {
    RemoteError::new(format!("Cannot read {}: {e}", path.display()))
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| {
            tracing::error!(error = ?e, status = status.as_u16(), "Unexpected response body");
            RemoteError::with_status(status.as_u16(), format!("Unexpected response body: {e}"))
        });
    }

    let body = response.text().await.unwrap_or_default();
    let message = server_message(&body).unwrap_or_else(|| {
        let body = body.trim();
        if body.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {body}")
        }
    });
    tracing::error!(status = status.as_u16(), message = %message, "Sharepoint returned an error");
    Err(RemoteError::with_status(status.as_u16(), message))
}

/// Extracts the human-readable message from an OData or OAuth error body.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let odata = value.get("odata.error").or_else(|| value.get("error"));
    if let Some(message) = odata.and_then(|e| e.get("message")) {
        if let Some(text) = message.get("value").and_then(Value::as_str) {
            return Some(text.to_string());
        }
        if let Some(text) = message.as_str() {
            return Some(text.to_string());
        }
    }
    value
        .get("error_description")
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
