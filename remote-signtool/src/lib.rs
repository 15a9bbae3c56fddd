// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! A `signtool.exe` stand-in that signs files remotely.

Build systems invoke `signtool sign <options...> <file>`. This crate accepts
that invocation, ignores everything but the file, and hands the file to a
signing backend:

* [NotaryClient] uploads it to a notary signing service and replaces it with
  the signed artifact the service returns. This is the default.
* [HelperSigner] runs a node helper that signs the file on a remote host.

Files whose extension isn't in [SIGNABLE_EXTENSIONS] are left alone.
*/

pub mod auth_token;
pub use auth_token::AuthTokenGenerator;
pub mod config;
pub use config::{BackendConfig, HelperConfig, NotaryConfig};
mod error;
pub use error::SigntoolError;
pub mod helper;
pub use helper::HelperSigner;
pub mod notary;
pub use notary::{HttpTransport, NotaryClient, NotaryTransport};
pub mod signing;
pub use signing::{
    file_to_sign, is_signable_extension, sign_path, SignOutcome, SigningBackend,
    SIGNABLE_EXTENSIONS,
};

#[cfg(test)]
mod testutil;

/// Construct the backend described by configuration.
pub fn backend_from_config(
    config: BackendConfig,
) -> Result<Box<dyn SigningBackend>, SigntoolError> {
    Ok(match config {
        BackendConfig::Notary(config) => Box::new(NotaryClient::from_config(config)?),
        BackendConfig::Helper(config) => Box::new(HelperSigner::new(config)),
    })
}
