// SPDX-FileCopyrightText: 2026 Modelplug Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Locating a plugin's icon inside its bundle.

use modelplug_core::ParseError;

use crate::bundle::{Bundle, normalize};

/// Conventional directory for bundle assets.
pub const ASSETS_DIR: &str = "_assets";

/// Read the icon named `filename` from `bundle`.
///
/// Looks in `_assets/` first, then at the root, then for any file whose
/// path ends with `/filename`. Returns `Ok(None)` when nothing matches.
pub fn extract_icon(bundle: &Bundle, filename: &str) -> Result<Option<Vec<u8>>, ParseError> {
    let filename = normalize(filename);
    if filename.is_empty() || filename.split('/').any(|part| part == "..") {
        return Err(ParseError::malformed(
            filename,
            "icon must be a relative path inside the bundle",
        ));
    }

    let assets = format!("{ASSETS_DIR}/{filename}");
    let suffix = format!("/{filename}");
    let found = [assets.as_str(), filename.as_str()]
        .into_iter()
        .find(|candidate| bundle.contains(candidate))
        .map(str::to_string)
        .or_else(|| {
            bundle
                .files()
                .iter()
                .find(|f| f.ends_with(&suffix))
                .cloned()
        });

    match found {
        Some(path) => bundle.read(&path).map(Some),
        None => Ok(None),
    }
}
