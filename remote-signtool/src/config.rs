// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Configuration read from the process environment.

All values are read once at startup into immutable structs. Lookups go
through a closure so tests can inject values without mutating the real
environment.
*/

use {
    crate::SigntoolError,
    reqwest::Url,
    std::{fmt::Debug, path::PathBuf},
};

pub const BACKEND_ENV: &str = "SIGNTOOL_BACKEND";

pub const NOTARY_SIGNING_KEY_ENV: &str = "NOTARY_SIGNING_KEY";
pub const NOTARY_SIGNING_COMMENT_ENV: &str = "NOTARY_SIGNING_COMMENT";
pub const NOTARY_AUTH_TOKEN_ENV: &str = "NOTARY_AUTH_TOKEN";
pub const NOTARY_URL_ENV: &str = "NOTARY_URL";

pub const HELPER_HOSTNAME_ENV: &str = "WINDOWS_SIGNING_SERVER_HOSTNAME";
pub const HELPER_PRIVATE_KEY_ENV: &str = "WINDOWS_SIGNING_SERVER_PRIVATE_KEY";
pub const HELPER_USERNAME_ENV: &str = "WINDOWS_SIGNING_SERVER_USERNAME";
pub const HELPER_PORT_ENV: &str = "WINDOWS_SIGNING_SERVER_PORT";
pub const HELPER_SCRIPT_ENV: &str = "SIGNTOOL_HELPER_SCRIPT";

/// Filename of the signing helper script when [HELPER_SCRIPT_ENV] isn't set.
const DEFAULT_HELPER_SCRIPT: &str = "cli.js";

/// Fetch a required value. Empty strings count as missing.
fn require(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, SigntoolError> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(SigntoolError::MissingEnvironmentVariable(name)),
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Directory containing the running executable.
fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
}

/// Settings for the notary service backend.
#[derive(Clone)]
pub struct NotaryConfig {
    /// Identifier of the signing key the service should use.
    pub signing_key: String,

    /// Free-form comment recorded by the service.
    pub comment: String,

    /// Shared secret that auth tokens are derived from.
    pub auth_secret: String,

    /// Base URL of the service, without a trailing `/`.
    pub url: String,
}

impl Debug for NotaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotaryConfig")
            .field("signing_key", &self.signing_key)
            .field("comment", &self.comment)
            .field("auth_secret", &"<redacted>")
            .field("url", &self.url)
            .finish()
    }
}

impl NotaryConfig {
    /// Resolve settings using an arbitrary variable lookup function.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SigntoolError> {
        let signing_key = require(&lookup, NOTARY_SIGNING_KEY_ENV)?;
        let comment = require(&lookup, NOTARY_SIGNING_COMMENT_ENV)?;
        let auth_secret = require(&lookup, NOTARY_AUTH_TOKEN_ENV)?;
        let url = require(&lookup, NOTARY_URL_ENV)?;

        let parsed = Url::parse(&url)
            .map_err(|e| SigntoolError::BadServiceUrl(url.clone(), e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(SigntoolError::BadServiceUrl(url, "not a base URL".to_string()));
        }

        Ok(Self {
            signing_key,
            comment,
            auth_secret,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, SigntoolError> {
        Self::from_lookup(process_env)
    }
}

/// Settings for the node signing helper backend.
#[derive(Clone)]
pub struct HelperConfig {
    pub script: PathBuf,
    pub host: String,
    pub private_key: String,
    pub username: String,
    pub port: String,
}

impl Debug for HelperConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperConfig")
            .field("script", &self.script)
            .field("host", &self.host)
            .field("private_key", &"<redacted>")
            .field("username", &self.username)
            .field("port", &self.port)
            .finish()
    }
}

impl HelperConfig {
    /// Resolve settings using an arbitrary variable lookup function.
    ///
    /// `default_script_dir` is where `cli.js` is looked for when no script is configured.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_script_dir: Option<PathBuf>,
    ) -> Result<Self, SigntoolError> {
        let host = require(&lookup, HELPER_HOSTNAME_ENV)?;
        let private_key = require(&lookup, HELPER_PRIVATE_KEY_ENV)?;
        let username = require(&lookup, HELPER_USERNAME_ENV)?;
        let port = require(&lookup, HELPER_PORT_ENV)?;

        let script = match lookup(HELPER_SCRIPT_ENV) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => default_script_dir
                .unwrap_or_default()
                .join(DEFAULT_HELPER_SCRIPT),
        };

        Ok(Self {
            script,
            host,
            private_key,
            username,
            port,
        })
    }

    /// Resolve settings from the process environment.
    pub fn from_env() -> Result<Self, SigntoolError> {
        Self::from_lookup(process_env, executable_dir())
    }
}

/// The signing backend selected for this invocation.
#[derive(Clone, Debug)]
pub enum BackendConfig {
    /// Upload to the notary service and download the signed result.
    Notary(NotaryConfig),

    /// Run the node signing helper, which signs the file in place.
    Helper(HelperConfig),
}

impl BackendConfig {
    /// Resolve the backend and its settings using a variable lookup function.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_script_dir: Option<PathBuf>,
    ) -> Result<Self, SigntoolError> {
        match lookup(BACKEND_ENV).as_deref() {
            None | Some("") | Some("notary") => {
                Ok(Self::Notary(NotaryConfig::from_lookup(lookup)?))
            }
            Some("helper") => Ok(Self::Helper(HelperConfig::from_lookup(
                lookup,
                default_script_dir,
            )?)),
            Some(other) => Err(SigntoolError::UnknownBackend(other.to_string())),
        }
    }

    /// Resolve the backend from the process environment.
    pub fn from_env() -> Result<Self, SigntoolError> {
        Self::from_lookup(process_env, executable_dir())
    }
}
