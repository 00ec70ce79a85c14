//! Reads content files: format detection (RON/JSON/TOML), file discovery and
//! deserialization of parts, upgrade levels and engine configuration.

use crate::schema::{PartData, UpgradeLevels};
use reactor_core::config::{ConfigError, EngineConfig};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Base name of the part table inside a content directory.
pub const PARTS_FILE: &str = "parts";
/// Base name of the optional engine configuration file.
pub const CONFIG_FILE: &str = "config";
/// Base name of the optional upgrade level file.
pub const UPGRADES_FILE: &str = "upgrades";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two parts share a name.
    #[error("duplicate part '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The configuration parsed but failed validation.
    #[error("invalid configuration in {file}: {source}")]
    Config {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    const EXTENSIONS: [&'static str; 3] = ["ron", "toml", "json"];
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in Format::EXTENSIONS {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from
/// extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML has no top-level arrays, so for TOML
/// files the array is read from `toml_key` of the top-level table. RON and
/// JSON files hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let mut table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .remove(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Content files
// ===========================================================================

/// Load a part table. Part names must be unique within the file.
///
/// TOML files list parts under `[[parts]]`.
pub fn load_parts(path: &Path) -> Result<Vec<PartData>, DataLoadError> {
    let parts: Vec<PartData> = deserialize_list(path, PARTS_FILE)?;

    let mut seen: HashSet<&str> = HashSet::with_capacity(parts.len());
    if let Some(dup) = parts.iter().find(|p| !seen.insert(p.name.as_str())) {
        return Err(DataLoadError::DuplicateName {
            file: path.to_path_buf(),
            name: dup.name.clone(),
        });
    }

    log::debug!("loaded {} parts from {}", parts.len(), path.display());
    Ok(parts)
}

/// Load and validate an engine configuration. Missing fields take their
/// defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, DataLoadError> {
    let config: EngineConfig = deserialize_file(path)?;
    config.validate().map_err(|source| DataLoadError::Config {
        file: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

/// Load upgrade levels. Missing fields are level zero.
pub fn load_upgrades(path: &Path) -> Result<UpgradeLevels, DataLoadError> {
    deserialize_file(path)
}

/// Everything a content directory provides.
#[derive(Debug, Clone)]
pub struct Content {
    pub config: EngineConfig,
    pub parts: Vec<PartData>,
    pub upgrades: UpgradeLevels,
}

/// Load a content directory: a required `parts` table plus optional
/// `config` and `upgrades` files, each in any supported format.
pub fn load_content(dir: &Path) -> Result<Content, DataLoadError> {
    let parts = load_parts(&require_data_file(dir, PARTS_FILE)?)?;
    let config = match find_data_file(dir, CONFIG_FILE)? {
        Some(path) => load_config(&path)?,
        None => EngineConfig::default(),
    };
    let upgrades = match find_data_file(dir, UPGRADES_FILE)? {
        Some(path) => load_upgrades(&path)?,
        None => UpgradeLevels::default(),
    };
    Ok(Content {
        config,
        parts,
        upgrades,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use reactor_core::component::{Category, ValveKind};
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "reactor_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    // -----------------------------------------------------------------------
    // detect_format / find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("parts.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("parts.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("parts.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["parts.yaml", "parts"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        assert_eq!(find_data_file(&dir, "parts").unwrap(), None);

        fs::write(dir.join("parts.json"), "[]").unwrap();
        assert_eq!(
            find_data_file(&dir, "parts").unwrap(),
            Some(dir.join("parts.json"))
        );

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("conflict");
        fs::write(dir.join("parts.ron"), "[]").unwrap();
        fs::write(dir.join("parts.json"), "[]").unwrap();

        assert!(matches!(
            find_data_file(&dir, "parts"),
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        let result = require_data_file(&dir, "parts");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "parts"
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_parts
    // -----------------------------------------------------------------------

    #[test]
    fn load_parts_ron() {
        let dir = make_test_dir("parts_ron");
        let path = dir.join("parts.ron");
        fs::write(
            &path,
            r#"[
                (name: "uranium_cell", category: cell, cost: 10.0, power: 1.0, heat: 1.0, ticks: 15.0),
                (name: "overflow_valve", category: valve, transfer: 20.0, valve: overflow),
            ]"#,
        )
        .unwrap();

        let parts = load_parts(&path).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].category, Category::Cell);
        assert_eq!(parts[0].level, 1);
        assert_eq!(parts[0].range, 1);
        assert_eq!(parts[1].valve, ValveKind::Overflow);

        cleanup(&dir);
    }

    #[test]
    fn load_parts_json() {
        let dir = make_test_dir("parts_json");
        let path = dir.join("parts.json");
        fs::write(
            &path,
            r#"[{"name": "vent", "category": "vent", "vent": 4.0, "containment": 80.0}]"#,
        )
        .unwrap();

        let parts = load_parts(&path).unwrap();
        assert_eq!(parts[0].vent, 4.0);
        assert_eq!(parts[0].containment, 80.0);
        assert!(!parts[0].perpetual);

        cleanup(&dir);
    }

    #[test]
    fn load_parts_toml() {
        let dir = make_test_dir("parts_toml");
        let path = dir.join("parts.toml");
        fs::write(
            &path,
            r#"
[[parts]]
name = "heat_exchanger"
category = "heat_exchanger"
transfer = 80.0
containment = 160.0
range = 2

[[parts]]
name = "top_up_valve"
category = "valve"
valve = "top_up"
"#,
        )
        .unwrap();

        let parts = load_parts(&path).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].range, 2);
        assert_eq!(parts[1].valve, ValveKind::TopUp);

        cleanup(&dir);
    }

    #[test]
    fn load_parts_toml_missing_key() {
        let dir = make_test_dir("parts_toml_missing");
        let path = dir.join("parts.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        assert!(matches!(load_parts(&path), Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn load_parts_rejects_duplicates() {
        let dir = make_test_dir("parts_dup");
        let path = dir.join("parts.json");
        fs::write(
            &path,
            r#"[{"name": "vent", "category": "vent"}, {"name": "vent", "category": "vent"}]"#,
        )
        .unwrap();

        assert!(matches!(
            load_parts(&path),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "vent"
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_parts_unknown_category_is_parse_error() {
        let dir = make_test_dir("parts_bad_category");
        let path = dir.join("parts.json");
        fs::write(&path, r#"[{"name": "x", "category": "flux_capacitor"}]"#).unwrap();

        let err = load_parts(&path).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
        assert!(format!("{err}").contains("parts.json"));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_config / load_upgrades
    // -----------------------------------------------------------------------

    #[test]
    fn load_config_fills_defaults() {
        let dir = make_test_dir("config_defaults");
        let path = dir.join("config.toml");
        fs::write(&path, "tick_period_ms = 250.0\nmax_multiplier = 4.0\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.tick_period_ms, 250.0);
        assert_eq!(config.max_multiplier, 4.0);
        assert_eq!(
            config.offline_threshold_ms,
            EngineConfig::DEFAULT_OFFLINE_THRESHOLD_MS
        );

        cleanup(&dir);
    }

    #[test]
    fn load_config_rejects_invalid() {
        let dir = make_test_dir("config_invalid");
        let path = dir.join("config.json");
        fs::write(&path, r#"{"overflow_to_heat_ratio": 2.0}"#).unwrap();

        assert!(matches!(
            load_config(&path),
            Err(DataLoadError::Config {
                source: ConfigError::OverflowRatio(_),
                ..
            })
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_upgrades_ron() {
        let dir = make_test_dir("upgrades_ron");
        let path = dir.join("upgrades.ron");
        fs::write(&path, "(cell_power: 2, cell_perpetual: true)").unwrap();

        let upgrades = load_upgrades(&path).unwrap();
        assert_eq!(upgrades.cell_power, 2);
        assert!(upgrades.cell_perpetual);
        assert_eq!(upgrades.vent_rate, 0);

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_content
    // -----------------------------------------------------------------------

    #[test]
    fn load_content_with_optional_files_absent() {
        let dir = make_test_dir("content_minimal");
        fs::write(dir.join("parts.json"), r#"[{"name": "vent", "category": "vent"}]"#).unwrap();

        let content = load_content(&dir).unwrap();
        assert_eq!(content.parts.len(), 1);
        assert_eq!(content.config, EngineConfig::default());
        assert_eq!(content.upgrades, UpgradeLevels::default());

        cleanup(&dir);
    }

    #[test]
    fn load_content_requires_parts() {
        let dir = make_test_dir("content_no_parts");
        fs::write(dir.join("config.json"), "{}").unwrap();

        assert!(matches!(
            load_content(&dir),
            Err(DataLoadError::MissingRequired { .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Error conversion
    // -----------------------------------------------------------------------

    #[test]
    fn io_error_converts() {
        let result = load_parts(Path::new("/nonexistent/reactor/parts.json"));
        assert!(matches!(result, Err(DataLoadError::Io(_))));
    }
}
