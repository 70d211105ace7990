//! Renaming self references when an asset is duplicated under a new path.

use crate::asset::AssetDocument;
use crate::utils::{asset_name, logical_asset_path, replace_ignore_ascii_case};

/// Rewrite the name map of `document` so it refers to `new_path` instead of `old_path`.
///
/// Entries containing the old logical path (`/Game/...`) get the new logical path.
/// Remaining entries containing the old bare asset name get the new asset name.
/// Returns the number of rewritten entries.
pub fn integrate(document: &mut AssetDocument, old_path: &str, new_path: &str) -> usize {
    let old_logical = logical_asset_path(old_path);
    let new_logical = logical_asset_path(new_path);
    let old_name = asset_name(old_path);
    let new_name = asset_name(new_path);

    let rewrites: Vec<(usize, String)> = document
        .names
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            replace_ignore_ascii_case(entry, &old_logical, &new_logical)
                .or_else(|| replace_ignore_ascii_case(entry, &old_name, &new_name))
                .map(|rewritten| (i, rewritten))
        })
        .collect();

    let count = rewrites.len();
    for (i, rewritten) in rewrites {
        tracing::trace!(index = i, name = %rewritten, "Rewrote name map entry");
        document.names.set(i, rewritten);
    }

    tracing::debug!(
        from = %old_logical,
        to = %new_logical,
        rewritten = count,
        "Copied asset references"
    );
    count
}
