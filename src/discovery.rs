use crate::{
    error::{ModError, Result},
    mods::Ue4ssMod,
    overrides,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub const ROOT_DIR_NAME: &str = "Mods";
pub const ROOT_PARENT_NAME: &str = "UE4SS";
/// Shared assets folder inside the root; never a mod.
pub const SHARED_DIR_NAME: &str = "SHARED";

const LOCATE_DEPTH: usize = 4;

/// True when `path` is named `Mods` and sits inside a folder named `UE4SS`,
/// both compared without ASCII case.
pub fn has_root_layout(path: &Path) -> bool {
    let named = |path: Option<&Path>, expected: &str| {
        path.and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case(expected))
            .unwrap_or(false)
    };
    named(Some(path), ROOT_DIR_NAME) && named(path.parent(), ROOT_PARENT_NAME)
}

pub fn check_root(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ModError::invalid_folder(path, "does not exist"));
    }
    if !path.is_dir() {
        return Err(ModError::invalid_folder(path, "not a directory"));
    }
    if !has_root_layout(path) {
        return Err(ModError::invalid_folder(
            path,
            format!("expected a {ROOT_DIR_NAME} folder inside {ROOT_PARENT_NAME}"),
        ));
    }
    Ok(())
}

/// Loads every valid mod folder under `root`.
///
/// Only the root check can fail the scan. Each subfolder is loaded on its
/// own: one that is not a valid mod is logged and skipped. Results follow
/// directory iteration order.
pub fn scan(root: &Path) -> Result<Vec<Ue4ssMod>> {
    check_root(root)?;
    let enabled_overrides = overrides::read_enabled_overrides(root);

    let mut mods = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(1)
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }
        let dir = entry.path();
        let stem = dir
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        if stem.eq_ignore_ascii_case(SHARED_DIR_NAME) {
            continue;
        }

        let override_enabled = enabled_overrides.contains(&stem);
        match Ue4ssMod::from_path(dir, override_enabled) {
            Ok(loaded) => mods.push(loaded),
            Err(err) => debug!(path = %dir.display(), error = %err, "skipping folder"),
        }
    }

    info!(root = %root.display(), count = mods.len(), "mods scanned");
    Ok(mods)
}

/// Finds a `UE4SS/Mods` folder at or near `start`.
///
/// `start` itself is accepted when it is a root, or when it is the `UE4SS`
/// folder holding one. Otherwise up to four ancestors are tried, each as a
/// root, as the parent of `Mods`, and as the parent of `UE4SS/Mods`.
pub fn locate_root(start: &Path) -> Option<PathBuf> {
    if has_root_layout(start) && start.is_dir() {
        return Some(start.to_path_buf());
    }

    let start_is_ue4ss = start
        .file_name()
        .map(|name| name.to_string_lossy().eq_ignore_ascii_case(ROOT_PARENT_NAME))
        .unwrap_or(false);
    if start_is_ue4ss {
        let candidate = start.join(ROOT_DIR_NAME);
        if candidate.is_dir() {
            return Some(candidate);
        }
    }

    let mut current = Some(start);
    for _ in 0..LOCATE_DEPTH {
        let Some(dir) = current else {
            break;
        };
        if has_root_layout(dir) && dir.is_dir() {
            return Some(dir.to_path_buf());
        }

        let mods = dir.join(ROOT_DIR_NAME);
        if mods.is_dir() && has_root_layout(&mods) {
            return Some(mods);
        }

        let nested = dir.join(ROOT_PARENT_NAME).join(ROOT_DIR_NAME);
        if nested.is_dir() {
            return Some(nested);
        }

        current = dir.parent();
    }

    None
}
