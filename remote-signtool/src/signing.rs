// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! The signing pipeline shared by every backend. */

use {
    crate::SigntoolError,
    log::warn,
    std::{ffi::OsString, path::Path},
};

/// File extensions we send off for signing. Compared case-insensitively.
pub const SIGNABLE_EXTENSIONS: &[&str] = &["exe", "dll", "msi", "msix", "appx", "cab", "nupkg"];

/// Something capable of signing a file in place.
pub trait SigningBackend {
    /// Sign the file at `path`, replacing it with its signed version.
    fn sign(&self, path: &Path) -> Result<(), SigntoolError>;
}

/// What happened to a file handed to [sign_path()].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SignOutcome {
    Signed,
    /// The file type isn't signable. This is not an error.
    Skipped,
}

/// Resolve the file to sign from command line arguments.
///
/// Like `signtool.exe sign`, the file is the final argument. Everything before
/// it (flags, certificate selectors, etc) is accepted and ignored.
pub fn file_to_sign(args: impl IntoIterator<Item = OsString>) -> Result<OsString, SigntoolError> {
    args.into_iter().last().ok_or(SigntoolError::NoArguments)
}

/// Whether a path has an extension in [SIGNABLE_EXTENSIONS].
pub fn is_signable_extension(path: &Path) -> bool {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) => SIGNABLE_EXTENSIONS
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext)),
        None => false,
    }
}

/// Sign a path if its type is eligible for signing.
pub fn sign_path(
    path: &Path,
    backend: &dyn SigningBackend,
) -> Result<SignOutcome, SigntoolError> {
    if !path.exists() {
        return Err(SigntoolError::FileNotFound(path.to_path_buf()));
    }

    if !is_signable_extension(path) {
        warn!("skipping {}: file type is not signed", path.display());
        return Ok(SignOutcome::Skipped);
    }

    backend.sign(path)?;

    Ok(SignOutcome::Signed)
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::testutil::*,
        std::{cell::RefCell, path::PathBuf},
    };

    #[derive(Default)]
    struct RecordingBackend {
        signed: RefCell<Vec<PathBuf>>,
    }

    impl SigningBackend for RecordingBackend {
        fn sign(&self, path: &Path) -> Result<(), SigntoolError> {
            self.signed.borrow_mut().push(path.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn last_argument_wins() -> Result<(), SigntoolError> {
        let args = ["sign", "/f", "cert.pfx", "/t", "http://timestamp", "dist\\setup.exe"]
            .iter()
            .map(OsString::from);

        assert_eq!(file_to_sign(args)?, OsString::from("dist\\setup.exe"));
        assert_eq!(
            file_to_sign(vec![OsString::from("only.msi")])?,
            OsString::from("only.msi")
        );

        Ok(())
    }

    #[test]
    fn no_arguments() {
        assert!(matches!(
            file_to_sign(Vec::new()),
            Err(SigntoolError::NoArguments)
        ));
    }

    #[test]
    fn extension_policy() {
        for path in ["a.exe", "b.DLL", "c.msi", "d.Msix", "e.appx", "f.cab", "g.nupkg"] {
            assert!(is_signable_extension(Path::new(path)), "{}", path);
        }

        for path in ["a.txt", "b.zip", "c.exe.sig", "Makefile", ".exe"] {
            assert!(!is_signable_extension(Path::new(path)), "{}", path);
        }
    }

    #[test]
    fn unsupported_extension_skipped() -> Result<(), SigntoolError> {
        let path = temp_file("unsupported_extension_skipped", "notes.txt", b"hello")?;
        let backend = RecordingBackend::default();

        assert_eq!(sign_path(&path, &backend)?, SignOutcome::Skipped);
        assert!(backend.signed.borrow().is_empty());
        assert_eq!(std::fs::read(&path)?, b"hello");

        Ok(())
    }

    #[test]
    fn missing_file() {
        let path = DEFAULT_TEMP_DIR.path().join("missing_file").join("setup.exe");
        let backend = RecordingBackend::default();

        match sign_path(&path, &backend) {
            Err(err @ SigntoolError::FileNotFound(_)) => {
                assert!(err.to_string().ends_with("does not exist"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(backend.signed.borrow().is_empty());
    }

    #[test]
    fn signable_file_signed() -> Result<(), SigntoolError> {
        let path = temp_file("signable_file_signed", "setup.exe", b"MZ")?;
        let backend = RecordingBackend::default();

        assert_eq!(sign_path(&path, &backend)?, SignOutcome::Signed);
        assert_eq!(backend.signed.borrow().as_slice(), &[path]);

        Ok(())
    }
}
