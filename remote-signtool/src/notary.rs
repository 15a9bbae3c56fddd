// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Client for the notary signing service.

Signing is a single round trip per stage. The file is POSTed as
`multipart/form-data` to `{url}/api/sign` along with the signing key, a
comment and an auth token. The service answers with a JSON object whose
`permalink` member points at the signed artifact. That artifact is then
fetched from `{url}{permalink}` into a temporary file and, once fully
received, copied over the original file.

Nothing is retried. The original file is not touched until the signed
bytes are on local disk.
*/

use {
    crate::{
        auth_token::AuthTokenGenerator, config::NotaryConfig, signing::SigningBackend,
        SigntoolError,
    },
    log::{debug, error, info},
    reqwest::{
        blocking::{multipart, Client, ClientBuilder},
        StatusCode,
    },
    serde_json::Value,
    std::{
        io::{Read, Seek, SeekFrom},
        path::{Path, PathBuf},
    },
};

/// Path of the submission endpoint relative to the service URL.
pub const SUBMISSION_PATH: &str = "/api/sign";

/// The payload of a signing submission.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Submission {
    /// Local file being uploaded.
    pub path: PathBuf,

    /// Filename advertised to the service. Never contains spaces.
    pub file_name: String,

    pub key: String,
    pub comment: String,
    pub auth_token: String,
}

/// An HTTP response as seen by the signing stages.
pub struct TransportResponse {
    pub status: StatusCode,
    pub body: Box<dyn Read>,
}

impl TransportResponse {
    /// Read the entire body as (lossy) text.
    fn into_text(mut self, url: &str) -> Result<String, SigntoolError> {
        let mut data = vec![];
        self.body
            .read_to_end(&mut data)
            .map_err(SigntoolError::io_context("reading response from", url))?;

        Ok(String::from_utf8_lossy(&data).into_owned())
    }
}

/// Sends requests to the notary service.
///
/// Implementations only move bytes. Interpreting status codes and payloads is
/// left to [NotaryClient].
pub trait NotaryTransport {
    /// POST a submission as `multipart/form-data`.
    fn post_submission(
        &self,
        url: &str,
        submission: &Submission,
    ) -> Result<TransportResponse, SigntoolError>;

    /// Issue a GET request.
    fn get(&self, url: &str) -> Result<TransportResponse, SigntoolError>;
}

/// Obtain the default [Client] to use for HTTP requests.
pub fn default_client() -> Result<Client, SigntoolError> {
    Ok(ClientBuilder::default()
        .user_agent(concat!("remote-signtool/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// [NotaryTransport] backed by a blocking [reqwest] client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, SigntoolError> {
        Ok(Self {
            client: default_client()?,
        })
    }

    /// Construct an instance using an already configured [Client].
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl NotaryTransport for HttpTransport {
    fn post_submission(
        &self,
        url: &str,
        submission: &Submission,
    ) -> Result<TransportResponse, SigntoolError> {
        let file = multipart::Part::file(&submission.path)
            .map_err(SigntoolError::io_context(
                "opening",
                submission.path.display(),
            ))?
            .file_name(submission.file_name.clone());

        let form = multipart::Form::new()
            .part("file", file)
            .text("key", submission.key.clone())
            .text("comment", submission.comment.clone())
            .text("auth_token", submission.auth_token.clone());

        let response = self.client.post(url).multipart(form).send()?;

        Ok(TransportResponse {
            status: response.status(),
            body: Box::new(response),
        })
    }

    fn get(&self, url: &str) -> Result<TransportResponse, SigntoolError> {
        let response = self.client.get(url).send()?;

        Ok(TransportResponse {
            status: response.status(),
            body: Box::new(response),
        })
    }
}

/// The filename of a path with all spaces removed.
///
/// The service rejects uploads whose filename contains spaces.
pub fn stripped_file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().replace(' ', ""))
        .unwrap_or_default()
}

/// URL that submissions are POSTed to.
pub fn submission_url(base_url: &str) -> String {
    format!("{}{}", base_url, SUBMISSION_PATH)
}

/// URL of the signed artifact referenced by a permalink.
///
/// The permalink is expected to be a path. Exactly one `/` separates it from
/// the base URL.
pub fn download_url(base_url: &str, permalink: &str) -> String {
    if permalink.starts_with('/') {
        format!("{}{}", base_url, permalink)
    } else {
        format!("{}/{}", base_url, permalink)
    }
}

/// Extract the `permalink` member from a submission response body.
pub fn parse_permalink(body: &str) -> Result<String, SigntoolError> {
    let value = serde_json::from_str::<Value>(body)?;

    let map = value
        .as_object()
        .ok_or_else(|| SigntoolError::NotJsonObject(body.to_string()))?;

    match map.get("permalink") {
        Some(Value::String(permalink)) => Ok(permalink.clone()),
        _ => Err(SigntoolError::MissingPermalink(body.to_string())),
    }
}

/// Turn an error status into [SigntoolError::ServiceStatus].
fn check_status(
    operation: &'static str,
    url: &str,
    response: TransportResponse,
) -> Result<TransportResponse, SigntoolError> {
    let status = response.status;

    if status.as_u16() >= 400 {
        let body = response.into_text(url)?;
        error!("{} request to {} returned {}", operation, url, status);
        error!("{}", body);

        Err(SigntoolError::ServiceStatus {
            operation,
            url: url.to_string(),
            status,
            body,
        })
    } else {
        Ok(response)
    }
}

/// Signs files by round tripping them through the notary service.
pub struct NotaryClient<T: NotaryTransport> {
    config: NotaryConfig,
    tokens: AuthTokenGenerator,
    transport: T,
}

impl NotaryClient<HttpTransport> {
    /// Construct a client talking HTTP to the configured service.
    pub fn from_config(config: NotaryConfig) -> Result<Self, SigntoolError> {
        Ok(Self::new(config, HttpTransport::new()?))
    }
}

impl<T: NotaryTransport> NotaryClient<T> {
    pub fn new(config: NotaryConfig, transport: T) -> Self {
        let tokens = AuthTokenGenerator::new(&config.auth_secret);

        Self {
            config,
            tokens,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload a file for signing, returning the permalink of the signed artifact.
    pub fn upload(&self, path: &Path) -> Result<String, SigntoolError> {
        if !path.exists() {
            return Err(SigntoolError::FileNotFound(path.to_path_buf()));
        }

        let submission = Submission {
            path: path.to_path_buf(),
            file_name: stripped_file_name(path),
            key: self.config.signing_key.clone(),
            comment: self.config.comment.clone(),
            auth_token: self.tokens.new_token(),
        };

        let url = submission_url(&self.config.url);
        info!(
            "uploading {} to {} as {}",
            path.display(),
            url,
            submission.file_name
        );

        let response = self.transport.post_submission(&url, &submission)?;
        let body = check_status("upload", &url, response)?.into_text(&url)?;

        let permalink = parse_permalink(&body)?;
        debug!("signed artifact available at {}", permalink);

        Ok(permalink)
    }

    /// Download the artifact at a permalink and write it over `path`.
    pub fn download_and_replace(&self, permalink: &str, path: &Path) -> Result<(), SigntoolError> {
        let url = download_url(&self.config.url, permalink);
        info!("downloading signed artifact from {}", url);

        let response = self.transport.get(&url)?;
        let mut response = check_status("download", &url, response)?;

        // Removed from disk when dropped, whatever happens below.
        let mut temp = tempfile::Builder::new()
            .prefix("signtool-")
            .tempfile()
            .map_err(SigntoolError::io_context(
                "creating temporary file in",
                std::env::temp_dir().display(),
            ))?;
        let temp_path = temp.path().display().to_string();

        let size = std::io::copy(&mut response.body, temp.as_file_mut())
            .map_err(SigntoolError::io_context("downloading", &url))?;
        debug!("received {} bytes into {}", size, temp_path);

        let fh = temp.as_file_mut();
        fh.seek(SeekFrom::Start(0))
            .map_err(SigntoolError::io_context("rewinding", &temp_path))?;

        let mut dest = std::fs::File::create(path)
            .map_err(SigntoolError::io_context("creating", path.display()))?;
        std::io::copy(fh, &mut dest)
            .and_then(|_| dest.sync_all())
            .map_err(SigntoolError::io_context("writing", path.display()))?;

        info!("replaced {} with signed artifact", path.display());

        Ok(())
    }
}

impl<T: NotaryTransport> SigningBackend for NotaryClient<T> {
    fn sign(&self, path: &Path) -> Result<(), SigntoolError> {
        let permalink = self.upload(path)?;
        self.download_and_replace(&permalink, path)
    }
}
