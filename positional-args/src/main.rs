// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Run `$BINARY "$@" $POSITIONAL_ARGS`.

Browser automation drivers prefix every argument they forward with `--`,
which makes it impossible to pass a bare positional argument to the
application under test. The driver launches this program instead, and we
append `POSITIONAL_ARGS` untouched. A shell script would do, but those don't
work on Windows.
*/

use {
    anyhow::{anyhow, Context, Result},
    log::info,
    std::ffi::OsString,
};

const BINARY_ENV: &str = "BINARY";
const POSITIONAL_ARGS_ENV: &str = "POSITIONAL_ARGS";

/// Arguments for the child: ours followed by the positional argument.
fn command_args(
    args: impl IntoIterator<Item = OsString>,
    positional: Option<OsString>,
) -> Vec<OsString> {
    args.into_iter()
        .chain(std::iter::once(positional.unwrap_or_default()))
        .collect()
}

fn main_impl() -> Result<()> {
    let binary = std::env::var_os(BINARY_ENV)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| anyhow!("must set {} environment variable", BINARY_ENV))?;

    let args = command_args(
        std::env::args_os().skip(1),
        std::env::var_os(POSITIONAL_ARGS_ENV),
    );

    info!("running command: {:?} {:?}", binary, args);

    duct::cmd(&binary, &args)
        .run()
        .with_context(|| format!("running {:?}", binary))?;

    info!("successfully ran {:?}", binary);

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            1
        }
    };

    std::process::exit(exit_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(values: &[&str]) -> Vec<OsString> {
        values.iter().map(OsString::from).collect()
    }

    #[test]
    fn positional_appended_last() {
        assert_eq!(
            command_args(
                os(&["--user-data-dir=/tmp/x", "--no-sandbox"]),
                Some("mongodb://localhost".into())
            ),
            os(&["--user-data-dir=/tmp/x", "--no-sandbox", "mongodb://localhost"])
        );
    }

    #[test]
    fn positional_kept_as_one_argument() {
        assert_eq!(command_args(os(&[]), Some("a b c".into())), os(&["a b c"]));
    }

    #[test]
    fn unset_positional_is_empty_argument() {
        assert_eq!(command_args(os(&["--flag"]), None), os(&["--flag", ""]));
    }
}
