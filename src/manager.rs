use crate::{
    discovery,
    error::Result,
    mods::Ue4ssMod,
    overrides,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Which backends a save writes. Each one is independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOptions {
    #[serde(default = "default_true")]
    pub write_marker_files: bool,
    #[serde(default)]
    pub write_json_manifest: bool,
    #[serde(default)]
    pub write_text_list: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            write_marker_files: true,
            write_json_manifest: false,
            write_text_list: false,
        }
    }
}

impl SaveOptions {
    pub fn all() -> Self {
        Self {
            write_marker_files: true,
            write_json_manifest: true,
            write_text_list: true,
        }
    }

    pub fn any(&self) -> bool {
        self.write_marker_files || self.write_json_manifest || self.write_text_list
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub enabled: usize,
    pub total: usize,
    pub wrote_marker_files: bool,
    pub wrote_json_manifest: bool,
    pub wrote_text_list: bool,
}

/// In-memory registry of the mods under one `UE4SS/Mods` root.
#[derive(Debug)]
pub struct ModManager {
    root: PathBuf,
    mods: Vec<Ue4ssMod>,
    native_names: Vec<String>,
}

impl ModManager {
    pub fn new(root: &Path) -> Result<Self> {
        discovery::check_root(root)?;
        let mods = discovery::scan(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            mods,
            native_names: Vec::new(),
        })
    }

    /// Marks the named mods as shipped with UE4SS itself. The marking is
    /// reapplied on every [`ModManager::reload`].
    pub fn set_native_names<S: AsRef<str>>(&mut self, names: &[S]) {
        self.native_names = names.iter().map(|name| name.as_ref().to_string()).collect();
        let mods = std::mem::take(&mut self.mods);
        self.mods = self.mark_native(mods);
    }

    /// Rescans the root and replaces the registry. Unsaved edits held by the
    /// caller are not merged back.
    pub fn reload(&mut self) -> Result<()> {
        let mods = discovery::scan(&self.root)?;
        self.mods = self.mark_native(mods);
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mods(&self) -> &[Ue4ssMod] {
        &self.mods
    }

    pub fn get(&self, name: &str) -> Option<&Ue4ssMod> {
        self.mods.iter().find(|loaded| loaded.name() == name)
    }

    /// Snapshot for a caller to edit and hand back to
    /// [`ModManager::apply_and_persist`].
    pub fn working_copy(&self) -> Vec<Ue4ssMod> {
        self.mods.clone()
    }

    pub fn enabled_names(&self) -> Vec<String> {
        self.names_where(|loaded| loaded.enabled())
    }

    pub fn disabled_names(&self) -> Vec<String> {
        self.names_where(|loaded| !loaded.enabled())
    }

    pub fn all_names(&self) -> Vec<String> {
        self.names_where(|_| true)
    }

    /// Writes the marker for every registry member named in `names`.
    /// Unknown names are ignored.
    pub fn enable_mods<S: AsRef<str>>(&mut self, names: &[S]) -> Result<usize> {
        let mut count = 0;
        for loaded in self.members_named(names) {
            loaded.enable()?;
            count += 1;
        }
        Ok(count)
    }

    pub fn disable_mods<S: AsRef<str>>(&mut self, names: &[S]) -> Result<usize> {
        let mut count = 0;
        for loaded in self.members_named(names) {
            loaded.disable()?;
            count += 1;
        }
        Ok(count)
    }

    /// Persists `desired` to the backends selected in `options`.
    ///
    /// Order is manifest, text list, then marker files. Nothing is rolled
    /// back: the first failing write returns its error and earlier writes
    /// stay on disk. Each marker write updates its registry member as it
    /// lands, so after a failure the registry matches the markers already
    /// written. Backends not selected are left untouched, so repeated
    /// partial saves can leave the three disagreeing.
    pub fn apply_and_persist(
        &mut self,
        desired: &[Ue4ssMod],
        options: SaveOptions,
    ) -> Result<SaveReport> {
        let (enabled, disabled): (Vec<&Ue4ssMod>, Vec<&Ue4ssMod>) =
            desired.iter().partition(|loaded| loaded.enabled());
        let enabled_names: Vec<&str> = enabled.iter().map(|loaded| loaded.name()).collect();

        if options.write_json_manifest {
            overrides::write_mods_json(&self.root, enabled_names.iter().copied())?;
        }

        if options.write_text_list {
            overrides::write_mods_txt(&self.root, enabled_names.iter().copied())?;
        }

        if options.write_marker_files {
            for loaded in &enabled {
                loaded.with_enabled(true).enable()?;
                self.sync_member(loaded.name(), true);
            }
            for loaded in &disabled {
                loaded.with_enabled(false).disable()?;
                self.sync_member(loaded.name(), false);
            }
        }

        for wanted in desired {
            self.sync_member(wanted.name(), wanted.enabled());
        }

        let report = SaveReport {
            enabled: enabled.len(),
            total: desired.len(),
            wrote_marker_files: options.write_marker_files,
            wrote_json_manifest: options.write_json_manifest,
            wrote_text_list: options.write_text_list,
        };
        info!(
            enabled = report.enabled,
            total = report.total,
            markers = report.wrote_marker_files,
            json = report.wrote_json_manifest,
            txt = report.wrote_text_list,
            "mod states saved"
        );
        Ok(report)
    }

    fn sync_member(&mut self, name: &str, enabled: bool) {
        if let Some(member) = self.mods.iter_mut().find(|member| member.name() == name) {
            member.set_enabled(enabled);
        }
    }

    fn mark_native(&self, mods: Vec<Ue4ssMod>) -> Vec<Ue4ssMod> {
        mods.into_iter()
            .map(|loaded| {
                let native = self.native_names.iter().any(|name| name == loaded.name());
                loaded.with_native(native)
            })
            .collect()
    }

    fn names_where(&self, keep: impl Fn(&Ue4ssMod) -> bool) -> Vec<String> {
        self.mods
            .iter()
            .filter(|loaded| keep(*loaded))
            .map(|loaded| loaded.name().to_string())
            .collect()
    }

    fn members_named<'a, S: AsRef<str>>(
        &'a mut self,
        names: &'a [S],
    ) -> impl Iterator<Item = &'a mut Ue4ssMod> + 'a {
        self.mods
            .iter_mut()
            .filter(move |loaded| names.iter().any(|name| name.as_ref() == loaded.name()))
    }
}

/// Flips every flag in `states` the way the "toggle all" control does: all
/// on when at most half are on, otherwise all off. Returns the new state.
pub fn toggle_all(states: &mut [Ue4ssMod]) -> bool {
    let enabled = states.iter().filter(|state| state.enabled()).count();
    let new_state = enabled * 2 <= states.len();
    set_all(states, new_state);
    new_state
}

pub fn set_all(states: &mut [Ue4ssMod], enabled: bool) {
    for state in states {
        state.set_enabled(enabled);
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mods::MARKER_FILE;
    use std::fs;
    use tempfile::TempDir;

    fn fixture(names: &[&str]) -> (TempDir, PathBuf) {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("UE4SS").join("Mods");
        for name in names {
            let scripts = root.join(name).join("scripts");
            fs::create_dir_all(&scripts).unwrap();
            fs::write(scripts.join("main.lua"), b"").unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        (temp, root)
    }

    fn sorted(mut names: Vec<String>) -> Vec<String> {
        names.sort();
        names
    }

    #[test]
    fn name_queries_split_by_state() {
        let (_temp, root) = fixture(&["A", "B", "C"]);
        fs::write(root.join("B").join(MARKER_FILE), b"").unwrap();

        let manager = ModManager::new(&root).unwrap();
        assert_eq!(sorted(manager.all_names()), vec!["A", "B", "C"]);
        assert_eq!(manager.enabled_names(), vec!["B"]);
        assert_eq!(sorted(manager.disabled_names()), vec!["A", "C"]);
        assert!(manager.get("B").unwrap().enabled());
        assert!(manager.get("Z").is_none());
    }

    #[test]
    fn enable_and_disable_by_name() {
        let (_temp, root) = fixture(&["A", "B"]);
        let mut manager = ModManager::new(&root).unwrap();

        assert_eq!(manager.enable_mods(&["A", "Missing"]).unwrap(), 1);
        assert!(root.join("A").join(MARKER_FILE).exists());
        assert!(manager.get("A").unwrap().enabled());

        assert_eq!(manager.disable_mods(&["A", "B"]).unwrap(), 2);
        assert!(!root.join("A").join(MARKER_FILE).exists());
        assert!(manager.enabled_names().is_empty());
    }

    #[test]
    fn reload_replaces_registry() {
        let (_temp, root) = fixture(&["A"]);
        let mut manager = ModManager::new(&root).unwrap();
        assert_eq!(manager.mods().len(), 1);

        let scripts = root.join("B").join("dlls");
        fs::create_dir_all(&scripts).unwrap();
        fs::write(scripts.join("main.dll"), b"").unwrap();
        fs::write(root.join("A").join(MARKER_FILE), b"").unwrap();

        manager.reload().unwrap();
        assert_eq!(sorted(manager.all_names()), vec!["A", "B"]);
        assert_eq!(manager.enabled_names(), vec!["A"]);
    }

    #[test]
    fn apply_updates_registry_flags() {
        let (_temp, root) = fixture(&["A", "B"]);
        let mut manager = ModManager::new(&root).unwrap();

        let desired: Vec<Ue4ssMod> = manager
            .working_copy()
            .iter()
            .map(|state| state.with_enabled(state.name() == "A"))
            .collect();
        let options = SaveOptions {
            write_marker_files: false,
            write_json_manifest: false,
            write_text_list: true,
        };
        let report = manager.apply_and_persist(&desired, options).unwrap();

        assert_eq!(report.enabled, 1);
        assert_eq!(report.total, 2);
        assert_eq!(manager.enabled_names(), vec!["A"]);
        assert!(!root.join("A").join(MARKER_FILE).exists());
        assert_eq!(
            fs::read_to_string(root.join("mods.txt")).unwrap(),
            "A : 1\n"
        );
        assert!(!root.join("mods.json").exists());
    }

    #[test]
    fn apply_with_no_backends_writes_nothing() {
        let (_temp, root) = fixture(&["A"]);
        let mut manager = ModManager::new(&root).unwrap();
        let desired: Vec<Ue4ssMod> = manager
            .working_copy()
            .iter()
            .map(|state| state.with_enabled(true))
            .collect();
        let options = SaveOptions {
            write_marker_files: false,
            write_json_manifest: false,
            write_text_list: false,
        };
        assert!(!options.any());

        manager.apply_and_persist(&desired, options).unwrap();
        assert!(!root.join("A").join(MARKER_FILE).exists());
        assert!(!root.join("mods.txt").exists());
        assert!(!root.join("mods.json").exists());
    }

    #[test]
    fn failed_marker_write_keeps_earlier_members_in_sync() {
        let (_temp, root) = fixture(&["A", "B", "C"]);
        // A directory where B's marker belongs makes B's enable fail.
        fs::create_dir_all(root.join("B").join(MARKER_FILE)).unwrap();
        let mut manager = ModManager::new(&root).unwrap();

        let mut desired: Vec<Ue4ssMod> = manager
            .working_copy()
            .iter()
            .map(|state| state.with_enabled(true))
            .collect();
        desired.sort_by(|a, b| a.name().cmp(b.name()));

        let err = manager
            .apply_and_persist(&desired, SaveOptions::default())
            .unwrap_err();
        assert!(matches!(err, crate::ModError::Io { .. }));

        assert!(root.join("A").join(MARKER_FILE).is_file());
        assert!(manager.get("A").unwrap().enabled());
        assert!(!root.join("C").join(MARKER_FILE).exists());
        assert!(!manager.get("C").unwrap().enabled());
    }

    #[test]
    fn native_names_survive_reload() {
        let (_temp, root) = fixture(&["Keybinds", "Custom"]);
        let mut manager = ModManager::new(&root).unwrap();
        manager.set_native_names(&["Keybinds"]);

        assert!(manager.get("Keybinds").unwrap().is_native());
        assert!(!manager.get("Custom").unwrap().is_native());

        manager.reload().unwrap();
        assert!(manager.get("Keybinds").unwrap().is_native());
        assert!(!manager.get("Custom").unwrap().is_native());
    }

    #[test]
    fn toggle_all_follows_majority() {
        let (_temp, root) = fixture(&["A", "B", "C", "D"]);
        let manager = ModManager::new(&root).unwrap();
        let mut states = manager.working_copy();

        states[0].set_enabled(true);
        states[1].set_enabled(true);
        assert!(toggle_all(&mut states));
        assert!(states.iter().all(|state| state.enabled()));

        assert!(!toggle_all(&mut states));
        assert!(states.iter().all(|state| !state.enabled()));

        set_all(&mut states, true);
        states[0].set_enabled(false);
        assert!(!toggle_all(&mut states));
    }

    #[test]
    fn save_options_default_to_markers_only() {
        let options = SaveOptions::default();
        assert!(options.write_marker_files);
        assert!(!options.write_json_manifest);
        assert!(!options.write_text_list);

        let parsed: SaveOptions = serde_json::from_str("{\"write_text_list\": true}").unwrap();
        assert!(parsed.write_marker_files);
        assert!(parsed.write_text_list);
        assert!(SaveOptions::all().write_json_manifest);
        assert!(SaveOptions::all().any());
    }
}
