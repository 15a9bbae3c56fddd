// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    clap::{Arg, ArgMatches, Command},
    log::{info, LevelFilter},
    remote_signtool::{
        backend_from_config, file_to_sign, sign_path, BackendConfig, SignOutcome, SigntoolError,
    },
    std::{ffi::OsString, path::PathBuf},
};

const ABOUT: &str = "\
Emulates `signtool.exe sign` by signing the file remotely.

Only the last argument is used: it is the path of the file to sign. All
other arguments are accepted for compatibility and ignored. The file is
replaced with its signed version.

The notary backend (the default) reads NOTARY_SIGNING_KEY,
NOTARY_SIGNING_COMMENT, NOTARY_AUTH_TOKEN and NOTARY_URL. Set
SIGNTOOL_BACKEND=helper to sign through the node signing helper instead.
";

/// The command line parser.
///
/// Every token, including things that look like flags, is collected into
/// `args` so the final one can be taken as the file to sign.
fn command() -> Command<'static> {
    Command::new("signtool")
        .version(env!("CARGO_PKG_VERSION"))
        .about("signtool.exe emulator delegating to a remote signing service")
        .long_about(ABOUT)
        .disable_help_flag(true)
        .disable_version_flag(true)
        .allow_hyphen_values(true)
        .trailing_var_arg(true)
        .arg(
            Arg::new("args")
                .takes_value(true)
                .multiple_values(true)
                .allow_hyphen_values(true)
                .allow_invalid_utf8(true)
                .help("signtool arguments; the last one is the file to sign"),
        )
}

/// Collect the raw argument values from parsed matches.
fn argument_values(matches: &ArgMatches) -> Vec<OsString> {
    matches
        .values_of_os("args")
        .map(|values| values.map(OsString::from).collect::<Vec<_>>())
        .unwrap_or_default()
}

fn main_impl() -> Result<(), SigntoolError> {
    let matches = command().get_matches();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));

    builder
        .format_timestamp(None)
        .format_level(false)
        .format_target(false);

    // This spews unwanted output at default level. Nerf it by default.
    builder.filter_module("rustls", LevelFilter::Error);

    builder.init();

    let path = PathBuf::from(file_to_sign(argument_values(&matches))?);
    let backend = backend_from_config(BackendConfig::from_env()?)?;

    match sign_path(&path, backend.as_ref())? {
        SignOutcome::Signed => info!("signed {}", path.display()),
        SignOutcome::Skipped => {}
    }

    Ok(())
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_for(argv: &[&str]) -> Result<OsString, SigntoolError> {
        let matches = command()
            .try_get_matches_from(argv)
            .expect("every argument list should parse");

        file_to_sign(argument_values(&matches))
    }

    #[test]
    fn leading_long_flag() -> Result<(), SigntoolError> {
        assert_eq!(file_for(&["signtool", "--foo", "a.exe"])?, "a.exe");

        Ok(())
    }

    #[test]
    fn signtool_style_arguments() -> Result<(), SigntoolError> {
        assert_eq!(
            file_for(&["signtool", "sign", "/fd", "sha256", "a.exe"])?,
            "a.exe"
        );
        assert_eq!(
            file_for(&[
                "signtool",
                "sign",
                "/f",
                "cert.pfx",
                "/tr",
                "http://timestamp.example.com",
                "dist\\My App.exe",
            ])?,
            "dist\\My App.exe"
        );

        Ok(())
    }

    #[test]
    fn help_and_version_flags_are_ignored() -> Result<(), SigntoolError> {
        assert_eq!(file_for(&["signtool", "-h", "a.exe"])?, "a.exe");
        assert_eq!(file_for(&["signtool", "--help", "a.exe"])?, "a.exe");
        assert_eq!(file_for(&["signtool", "-V", "a.exe"])?, "a.exe");
        assert_eq!(file_for(&["signtool", "-a", "-v", "a.exe"])?, "a.exe");

        Ok(())
    }

    #[test]
    fn double_dash() -> Result<(), SigntoolError> {
        assert_eq!(file_for(&["signtool", "--", "a.exe"])?, "a.exe");
        assert_eq!(file_for(&["signtool", "sign", "--", "a.exe"])?, "a.exe");

        Ok(())
    }

    #[test]
    fn single_argument() -> Result<(), SigntoolError> {
        assert_eq!(file_for(&["signtool", "a.exe"])?, "a.exe");

        Ok(())
    }

    #[test]
    fn no_arguments() {
        assert!(matches!(
            file_for(&["signtool"]),
            Err(SigntoolError::NoArguments)
        ));
    }
}
