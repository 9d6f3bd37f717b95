//! Registry and enable-state reconciliation for mods living under a
//! `UE4SS/Mods` folder.
//!
//! A mod is enabled by an `enabled.txt` marker in its folder, and UE4SS also
//! reads two legacy lists at the root (`mods.txt`, `mods.json`). Discovery
//! merges all three into one in-memory registry; saving writes any subset of
//! them back.

pub mod discovery;
pub mod error;
pub mod manager;
pub mod mods;
pub mod overrides;

pub use discovery::{check_root, locate_root, scan};
pub use error::{ModError, Result};
pub use manager::{set_all, toggle_all, ModManager, SaveOptions, SaveReport};
pub use mods::{ModLang, Ue4ssMod, MARKER_FILE};
