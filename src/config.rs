use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use ue4ss_modman::SaveOptions;

const APP_DIR_NAME: &str = "ue4ss-modman";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pinned `UE4SS/Mods` folder; auto-detected when unset.
    #[serde(default)]
    pub mods_root: Option<PathBuf>,
    #[serde(default)]
    pub save: SaveOptions,
    #[serde(default = "default_true")]
    pub log_to_file: bool,
    /// Mods that ship with UE4SS rather than being user-installed.
    #[serde(default = "default_native_mods")]
    pub native_mods: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mods_root: None,
            save: SaveOptions::default(),
            log_to_file: true,
            native_mods: default_native_mods(),
        }
    }
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        let path = config_path()?;
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            return Ok(config);
        }

        let config = AppConfig::default();
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let base_dir = base_data_dir()?;
        fs::create_dir_all(&base_dir).context("create app data dir")?;
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(base_dir.join("config.json"), raw).context("write app config")?;
        Ok(())
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(base_data_dir()?.join("config.json"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(base_data_dir()?.join(format!("{APP_DIR_NAME}.log")))
}

pub fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join(APP_DIR_NAME))
}

fn default_true() -> bool {
    true
}

fn default_native_mods() -> Vec<String> {
    [
        "BPModLoaderMod",
        "BPML_GenericFunctions",
        "CheatManagerEnablerMod",
        "ConsoleCommandsMod",
        "ConsoleEnablerMod",
        "Keybinds",
        "LineTraceMod",
        "SplitScreenMod",
        "jsbLuaProfilerMod",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}
