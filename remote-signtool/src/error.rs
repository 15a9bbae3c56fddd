// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    reqwest::StatusCode,
    std::{fmt::Display, path::PathBuf},
    thiserror::Error,
};

/// Unified error type for remote signing.
#[derive(Debug, Error)]
pub enum SigntoolError {
    #[error("must have at least one argument (the file to sign) on the command line")]
    NoArguments,

    #[error("must set {0} environment variable")]
    MissingEnvironmentVariable(&'static str),

    #[error("invalid signing service URL {0}: {1}")]
    BadServiceUrl(String, String),

    #[error("unknown signing backend: {0} (expected notary or helper)")]
    UnknownBackend(String),

    #[error("file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("{operation} request to {url} failed: {status}: {body}")]
    ServiceStatus {
        operation: &'static str,
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("signing service response is missing permalink: {0}")]
    MissingPermalink(String),

    #[error("signing service response is not a JSON object: {0}")]
    NotJsonObject(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error {operation} {target}: {source}")]
    IoContext {
        operation: &'static str,
        target: String,
        source: std::io::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("signing helper failed: {0}")]
    HelperFailed(String),
}

impl SigntoolError {
    /// Wrap an I/O error with what we were doing and to what.
    pub fn io_context(
        operation: &'static str,
        target: impl Display,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let target = target.to_string();

        move |source| Self::IoContext {
            operation,
            target,
            source,
        }
    }
}
