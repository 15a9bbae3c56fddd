// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::SigntoolError,
    once_cell::sync::Lazy,
    std::path::PathBuf,
};

pub static DEFAULT_TEMP_DIR: Lazy<tempfile::TempDir> = Lazy::new(|| {
    tempfile::Builder::new()
        .prefix("remote-signtool-test")
        .tempdir()
        .expect("unable to create temporary directory")
});

/// Write a file named `name` into a directory dedicated to `test`.
pub fn temp_file(test: &str, name: &str, content: &[u8]) -> Result<PathBuf, SigntoolError> {
    let dir = DEFAULT_TEMP_DIR.path().join(test);
    std::fs::create_dir_all(&dir)?;

    let path = dir.join(name);
    std::fs::write(&path, content)?;

    Ok(path)
}
