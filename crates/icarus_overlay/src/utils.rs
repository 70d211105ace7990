//! Virtual path helpers.
//!
//! Virtual paths are forward-slash separated and rooted at the game's project
//! directory (`Icarus/Content/...`). Inside cooked assets the same objects are
//! referred to by their logical package path (`/Game/...`, no extension).

use camino::Utf8Path;

/// On-disk content root inside the virtual tree.
pub const CONTENT_ROOT: &str = "Icarus/Content";

/// Logical root cooked assets use for [`CONTENT_ROOT`].
pub const GAME_ROOT: &str = "/Game";

/// Normalize separators to forward slashes.
pub fn normalize_virtual_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Logical package path for a virtual asset path.
///
/// - `Icarus/Content/Foo/Bar.uasset` -> `/Game/Foo/Bar`
/// - `Other/Thing.uasset` -> `Other/Thing`
pub fn logical_asset_path(path: &str) -> String {
    let path = normalize_virtual_path(path);
    let stem = strip_extension(&path);

    let prefix_len = CONTENT_ROOT.len();
    if stem.len() >= prefix_len
        && stem.is_char_boundary(prefix_len)
        && stem[..prefix_len].eq_ignore_ascii_case(CONTENT_ROOT)
        && (stem.len() == prefix_len || stem[prefix_len..].starts_with('/'))
    {
        format!("{}{}", GAME_ROOT, &stem[prefix_len..])
    } else {
        stem.to_string()
    }
}

/// Bare asset name: last path segment without its extension.
pub fn asset_name(path: &str) -> String {
    let path = normalize_virtual_path(path);
    let file_name = path.rsplit('/').next().unwrap_or(&path);
    strip_extension(file_name).to_string()
}

/// Replace the extension of a virtual path (adding one if it has none).
pub fn change_extension(path: &str, extension: &str) -> String {
    let extension = extension.trim_start_matches('.');
    format!("{}.{}", strip_extension(path), extension)
}

fn strip_extension(path: &str) -> &str {
    let file_start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[file_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..file_start + dot],
        _ => path,
    }
}

/// Virtual path of an archive entry mounted at `mount_point`.
///
/// Mount points are relative to the game's `Content/Paks` directory, so leading
/// `../` segments that climb to the install root are dropped.
///
/// - (`../../../`, `Icarus/Content/A.json`) -> `Icarus/Content/A.json`
/// - (`../../../Icarus/Content/`, `Data/A.json`) -> `Icarus/Content/Data/A.json`
pub fn mounted_path(mount_point: &str, entry: &str) -> String {
    let mount_point = normalize_virtual_path(mount_point);
    let mut root = mount_point.as_str();
    while let Some(rest) = root.strip_prefix("../") {
        root = rest;
    }
    let root = root.trim_matches('/');
    let entry = normalize_virtual_path(entry);
    let entry = entry.trim_start_matches('/');

    if root.is_empty() {
        entry.to_string()
    } else {
        format!("{}/{}", root, entry)
    }
}

/// Output name for a mod's bundled archive.
///
/// `index` is the mod's 0-based position in the managed list. The game only
/// mounts paks whose stem ends in `_P` as patch paks, so the suffix is added
/// when missing.
pub fn passthrough_archive_name(index: usize, archive_name: &str) -> String {
    let stem = Utf8Path::new(archive_name)
        .file_stem()
        .unwrap_or(archive_name);
    let suffix = if stem.ends_with("_P") { "" } else { "_P" };
    format!("{:03}-{}{}.pak", index + 1, stem, suffix)
}

/// Replace every ASCII case-insensitive occurrence of `needle` in `haystack`.
///
/// Unlike an exact-case replace, entries spelled with different casing than
/// `needle` are rewritten too.
///
/// Returns `None` when `needle` does not occur.
pub fn replace_ignore_ascii_case(haystack: &str, needle: &str, replacement: &str) -> Option<String> {
    if needle.is_empty() {
        return None;
    }

    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_needle = needle.to_ascii_lowercase();

    let mut result = String::with_capacity(haystack.len());
    let mut last = 0;
    let mut found = false;
    for (start, _) in lower_haystack.match_indices(&lower_needle) {
        result.push_str(&haystack[last..start]);
        result.push_str(replacement);
        last = start + needle.len();
        found = true;
    }

    if !found {
        return None;
    }
    result.push_str(&haystack[last..]);
    Some(result)
}
