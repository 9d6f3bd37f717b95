//! The two legacy enable lists UE4SS reads from the root of `Mods/`:
//! `mods.txt` (`Name : 1` lines) and `mods.json` (an array of
//! `{mod_name, mod_enabled}` records).

use crate::error::{ModError, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    fs, io,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

pub const MODS_TXT: &str = "mods.txt";
pub const MODS_JSON: &str = "mods.json";

const UTF8_BOM: char = '\u{feff}';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub mod_name: String,
    #[serde(default)]
    pub mod_enabled: bool,
}

pub fn mods_txt_path(root: &Path) -> PathBuf {
    root.join(MODS_TXT)
}

pub fn mods_json_path(root: &Path) -> PathBuf {
    root.join(MODS_JSON)
}

/// Names marked enabled by either legacy list. A missing file contributes
/// nothing; so does a file that cannot be read or parsed.
pub fn read_enabled_overrides(root: &Path) -> HashSet<String> {
    let mut names = HashSet::new();

    let txt_path = mods_txt_path(root);
    match read_optional(&txt_path) {
        Ok(Some(raw)) => names.extend(parse_mods_txt(&raw)),
        Ok(None) => {}
        Err(err) => warn!(path = %txt_path.display(), error = %err, "ignoring unreadable mods.txt"),
    }

    let json_path = mods_json_path(root);
    match read_optional(&json_path) {
        Ok(Some(raw)) => match parse_mods_json(&raw) {
            Ok(entries) => names.extend(
                entries
                    .into_iter()
                    .filter(|entry| entry.mod_enabled)
                    .map(|entry| entry.mod_name),
            ),
            Err(err) => {
                warn!(path = %json_path.display(), error = %err, "ignoring malformed mods.json")
            }
        },
        Ok(None) => {}
        Err(err) => {
            warn!(path = %json_path.display(), error = %err, "ignoring unreadable mods.json")
        }
    }

    debug!(count = names.len(), "enabled overrides read");
    names
}

/// Enabled names from `mods.txt`. Lines look like `Name : 1`; `;` starts a
/// comment line and any value other than `1` means disabled.
pub fn parse_mods_txt(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| line.trim_start_matches(UTF8_BOM).trim())
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .filter_map(|line| line.rsplit_once(':'))
        .filter(|(_, value)| value.trim() == "1")
        .map(|(name, _)| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Parses `mods.json`, tolerating a leading UTF-8 BOM.
pub fn parse_mods_json(raw: &str) -> serde_json::Result<Vec<ManifestEntry>> {
    serde_json::from_str(raw.trim_start_matches(UTF8_BOM))
}

pub fn render_mods_txt<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
    names
        .into_iter()
        .map(|name| format!("{name} : 1\n"))
        .collect()
}

/// Pretty JSON with four-space indentation, no trailing newline.
pub fn render_mods_json<'a>(names: impl IntoIterator<Item = &'a str>) -> serde_json::Result<String> {
    let entries: Vec<ManifestEntry> = names
        .into_iter()
        .map(|name| ManifestEntry {
            mod_name: name.to_string(),
            mod_enabled: true,
        })
        .collect();

    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, formatter);
    entries.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Replaces `mods.txt` with one `Name : 1` line per name.
pub fn write_mods_txt<'a>(root: &Path, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let path = mods_txt_path(root);
    replace_file(&path, &render_mods_txt(names))?;
    debug!(path = %path.display(), "mods.txt written");
    Ok(())
}

/// Replaces `mods.json` with the enabled names. Fields added by hand to the
/// previous file are not carried over.
pub fn write_mods_json<'a>(root: &Path, names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let path = mods_json_path(root);
    let raw = render_mods_json(names).map_err(|source| ModError::Json {
        path: path.clone(),
        source,
    })?;
    replace_file(&path, &raw)?;
    debug!(path = %path.display(), "mods.json written");
    Ok(())
}

fn replace_file(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).map_err(|err| ModError::io(path, err))?;
    }
    fs::write(path, contents).map_err(|err| ModError::io(path, err))
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn mods_txt_keeps_enabled_names() {
        let raw = "; comment line\nFoo : 1\nBar : 0\n  Baz:1  \n\nKeybinds : 1\nbroken line\n";
        assert_eq!(parse_mods_txt(raw), vec!["Foo", "Baz", "Keybinds"]);
    }

    #[test]
    fn mods_txt_tolerates_bom_and_crlf() {
        let raw = "\u{feff}Foo : 1\r\nBar : 1\r\n";
        assert_eq!(parse_mods_txt(raw), vec!["Foo", "Bar"]);
    }

    #[test]
    fn mods_json_tolerates_bom_and_missing_flag() {
        let raw = "\u{feff}[{\"mod_name\": \"A\", \"mod_enabled\": true}, {\"mod_name\": \"B\"}]";
        let entries = parse_mods_json(raw).unwrap();
        assert_eq!(
            entries,
            vec![
                ManifestEntry {
                    mod_name: "A".to_string(),
                    mod_enabled: true
                },
                ManifestEntry {
                    mod_name: "B".to_string(),
                    mod_enabled: false
                },
            ]
        );
    }

    #[test]
    fn rendered_json_matches_legacy_layout() {
        let raw = render_mods_json(["A", "B"]).unwrap();
        let expected = "[\n    {\n        \"mod_name\": \"A\",\n        \"mod_enabled\": true\n    },\n    {\n        \"mod_name\": \"B\",\n        \"mod_enabled\": true\n    }\n]";
        assert_eq!(raw, expected);
    }

    #[test]
    fn rendered_json_keeps_non_ascii() {
        let raw = render_mods_json(["Über"]).unwrap();
        assert!(raw.contains("Über"));
    }

    #[test]
    fn empty_lists_render_empty() {
        assert_eq!(render_mods_txt(std::iter::empty::<&str>()), "");
        assert_eq!(render_mods_json(std::iter::empty::<&str>()).unwrap(), "[]");
    }

    #[test]
    fn overrides_merge_both_sources() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MODS_TXT), "Foo : 1\nBar : 0\n").unwrap();
        fs::write(
            temp.path().join(MODS_JSON),
            "[{\"mod_name\": \"Baz\", \"mod_enabled\": true}, {\"mod_name\": \"Foo\", \"mod_enabled\": true}, {\"mod_name\": \"Off\", \"mod_enabled\": false}]",
        )
        .unwrap();

        let names = read_enabled_overrides(temp.path());
        let expected: HashSet<String> = ["Foo", "Baz"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn malformed_json_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MODS_TXT), "Foo : 1\n").unwrap();
        fs::write(temp.path().join(MODS_JSON), "{ not json").unwrap();

        let names = read_enabled_overrides(temp.path());
        assert_eq!(names.len(), 1);
        assert!(names.contains("Foo"));
    }

    #[test]
    fn written_files_round_trip() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(MODS_JSON), "[{\"mod_name\": \"Old\", \"mod_enabled\": true, \"extra\": 1}]").unwrap();

        write_mods_json(temp.path(), ["A", "B"]).unwrap();
        write_mods_txt(temp.path(), ["A", "B"]).unwrap();

        let txt = fs::read_to_string(temp.path().join(MODS_TXT)).unwrap();
        assert_eq!(txt, "A : 1\nB : 1\n");

        let names = read_enabled_overrides(temp.path());
        let expected: HashSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
        assert_eq!(names, expected);
    }
}
