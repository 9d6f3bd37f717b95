use crate::error::{ModError, Result};
use std::{
    fs,
    hash::{Hash, Hasher},
    path::{Path, PathBuf},
};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Sentinel whose presence inside a mod folder means "enabled".
pub const MARKER_FILE: &str = "enabled.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModLang {
    Lua,
    Cpp,
}

impl ModLang {
    pub fn label(self) -> &'static str {
        match self {
            ModLang::Lua => "lua",
            ModLang::Cpp => "cpp",
        }
    }

    pub fn script_dir(self) -> &'static str {
        match self {
            ModLang::Lua => "scripts",
            ModLang::Cpp => "dlls",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ModLang::Lua => "lua",
            ModLang::Cpp => "dll",
        }
    }

    pub fn main_file(self) -> &'static str {
        match self {
            ModLang::Lua => "main.lua",
            ModLang::Cpp => "main.dll",
        }
    }
}

/// A single mod folder under the registry root.
///
/// Identity is the folder stem alone: two mods loaded from different paths
/// with the same stem compare equal and hash the same. Path, scripts and the
/// enabled flag never take part in equality.
///
/// `enabled` is a snapshot of the marker file taken at construction. Only
/// [`Ue4ssMod::enable`] and [`Ue4ssMod::disable`] touch the disk; the other
/// setters change the in-memory flag alone.
#[derive(Debug, Clone)]
pub struct Ue4ssMod {
    name: String,
    path: PathBuf,
    enabled: bool,
    scripts: Vec<String>,
    is_native: bool,
    lang: ModLang,
}

impl Ue4ssMod {
    pub fn from_path(path: &Path, override_enabled: bool) -> Result<Self> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();

        if name.is_empty() {
            return Err(ModError::invalid_mod(
                &path.display().to_string(),
                "folder has no name",
            ));
        }
        if !path.is_dir() {
            return Err(ModError::invalid_mod(&name, "not a directory"));
        }

        let mut scripts = collect_scripts(path, ModLang::Lua);
        scripts.extend(collect_scripts(path, ModLang::Cpp));

        if scripts.is_empty() {
            return Err(ModError::invalid_mod(&name, "no scripts"));
        }

        let has_main = |lang: ModLang| {
            scripts
                .iter()
                .any(|script| script.eq_ignore_ascii_case(lang.main_file()))
        };
        // main.lua wins when both entry points ship.
        let lang = if has_main(ModLang::Lua) {
            ModLang::Lua
        } else if has_main(ModLang::Cpp) {
            ModLang::Cpp
        } else {
            return Err(ModError::invalid_mod(
                &name,
                format!("no main file among {}", scripts.join(", ")),
            ));
        };

        let enabled = path.join(MARKER_FILE).exists() || override_enabled;
        debug!(
            mod_name = %name,
            enabled,
            scripts = scripts.len(),
            lang = lang.label(),
            "loaded mod"
        );

        Ok(Self {
            name,
            path: path.to_path_buf(),
            enabled,
            scripts,
            is_native: false,
            lang,
        })
    }

    /// Marks the mod as shipped with the framework itself.
    pub fn with_native(mut self, is_native: bool) -> Self {
        self.is_native = is_native;
        self
    }

    /// Copy with a different in-memory flag. Nothing is written.
    pub fn with_enabled(&self, enabled: bool) -> Self {
        let mut copy = self.clone();
        copy.enabled = enabled;
        copy
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn is_native(&self) -> bool {
        self.is_native
    }

    pub fn lang(&self) -> ModLang {
        self.lang
    }

    pub fn marker_path(&self) -> PathBuf {
        self.path.join(MARKER_FILE)
    }

    pub fn has_marker(&self) -> bool {
        self.marker_path().exists()
    }

    pub fn enable(&mut self) -> Result<()> {
        let marker = self.marker_path();
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&marker)
            .map_err(|err| ModError::io(&marker, err))?;
        self.enabled = true;
        debug!(mod_name = %self.name, marker = %marker.display(), "mod enabled");
        Ok(())
    }

    pub fn disable(&mut self) -> Result<()> {
        let marker = self.marker_path();
        if marker.exists() {
            fs::remove_file(&marker).map_err(|err| ModError::io(&marker, err))?;
            debug!(mod_name = %self.name, marker = %marker.display(), "marker removed");
        } else {
            warn!(mod_name = %self.name, marker = %marker.display(), "marker already absent");
        }
        self.enabled = false;
        debug!(mod_name = %self.name, "mod disabled");
        Ok(())
    }
}

impl PartialEq for Ue4ssMod {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Ue4ssMod {}

impl Hash for Ue4ssMod {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// File names directly under `<mod>/<script_dir>/` with the language's
/// extension. Directory and extension matching ignore ASCII case.
fn collect_scripts(mod_root: &Path, lang: ModLang) -> Vec<String> {
    let mut scripts: Vec<String> = WalkDir::new(mod_root)
        .follow_links(true)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .parent()
                .and_then(|parent| parent.file_name())
                .map(|dir| dir.to_string_lossy().eq_ignore_ascii_case(lang.script_dir()))
                .unwrap_or(false)
        })
        .filter(|entry| {
            entry
                .path()
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(lang.extension()))
                .unwrap_or(false)
        })
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    scripts.sort();
    scripts
}
