// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Signing through the node signing helper.

The helper script copies the file to a signing server over SSH, signs it
there and copies it back over the original. We only assemble its command
line and report on how it went.
*/

use {
    crate::{config::HelperConfig, signing::SigningBackend, SigntoolError},
    log::{info, warn},
    std::{
        io::{BufRead, BufReader},
        path::Path,
    },
};

/// Program used to run the helper script.
const NODE_EXE: &str = "node";

/// Signs files by invoking the node signing helper.
#[derive(Clone, Debug)]
pub struct HelperSigner {
    config: HelperConfig,
    program: String,
}

impl HelperSigner {
    pub fn new(config: HelperConfig) -> Self {
        Self {
            config,
            program: NODE_EXE.to_string(),
        }
    }

    /// Run the helper script with something other than `node`.
    pub fn program(mut self, program: impl ToString) -> Self {
        self.program = program.to_string();
        self
    }

    /// Derive the arguments to the helper for signing a path.
    pub fn arguments(&self, path: &Path) -> Vec<String> {
        vec![
            self.config.script.display().to_string(),
            "sign".to_string(),
            format!("--file={}", path.display()),
            format!("--host={}", self.config.host),
            format!("--private-key={}", self.config.private_key),
            format!("--username={}", self.config.username),
            format!("--port={}", self.config.port),
        ]
    }

    /// Arguments with the private key hidden, suitable for logging.
    fn redacted_arguments(&self, path: &Path) -> Vec<String> {
        self.arguments(path)
            .into_iter()
            .map(|arg| {
                if arg.starts_with("--private-key=") {
                    "--private-key=<redacted>".to_string()
                } else {
                    arg
                }
            })
            .collect()
    }
}

impl SigningBackend for HelperSigner {
    fn sign(&self, path: &Path) -> Result<(), SigntoolError> {
        info!(
            "running {} with args: {:?}",
            self.program,
            self.redacted_arguments(path)
        );

        let command = duct::cmd(&self.program, self.arguments(path))
            .stderr_to_stdout()
            .unchecked()
            .reader()?;
        {
            let reader = BufReader::new(&command);
            for line in reader.lines() {
                warn!("{}", line?);
            }
        }

        let output = command
            .try_wait()?
            .ok_or_else(|| SigntoolError::HelperFailed("unable to wait on command".into()))?;

        if output.status.success() {
            info!("file signed successfully");
            Ok(())
        } else {
            Err(SigntoolError::HelperFailed(format!(
                "{} exited with {}",
                self.program, output.status
            )))
        }
    }
}
