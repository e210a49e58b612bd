//! Experiment description with schema versioning and migration.
//!
//! Stored as JSON with a `version` field. Files written before the field
//! existed (version 0) used a flat `catalog` + `variant_indices` layout and
//! are migrated on load.

use crate::session::TrialEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use vvplay_core::{defaults, ContentDescriptor, PlayerConfig, Result, VvError};
use vvplay_schedule::{Catalog, VariantSpec};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// The clip every trial of an experiment plays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    pub name: String,
    pub quality_tier: u32,
    pub start_frame: u32,
    pub last_frame: u32,
    pub fps: u32,
    pub root: PathBuf,
    /// Overrides `frame_count / fps` when set.
    pub duration_secs: Option<f32>,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            name: defaults::CONTENT_NAME.to_string(),
            quality_tier: defaults::QUALITY_TIER,
            start_frame: defaults::START_FRAME,
            last_frame: defaults::LAST_FRAME,
            fps: defaults::SOURCE_FPS,
            root: PathBuf::from(defaults::ROOT_PATH),
            duration_secs: None,
        }
    }
}

impl ContentSettings {
    pub fn descriptor(&self) -> Result<ContentDescriptor> {
        let content = ContentDescriptor::new(
            self.name.clone(),
            self.quality_tier,
            self.start_frame,
            self.last_frame,
            self.fps,
            self.root.clone(),
        )?;
        match self.duration_secs {
            Some(seconds) => content.with_duration(seconds),
            None => Ok(content),
        }
    }
}

/// Which variants a session presents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum VariantSelection {
    /// Entries of a built-in table; all of them when `indices` is absent.
    Catalog {
        catalog: Catalog,
        #[serde(default)]
        indices: Option<Vec<usize>>,
    },
    /// Hand-written variants, identified by their position.
    Explicit { variants: Vec<VariantSpec> },
}

impl Default for VariantSelection {
    fn default() -> Self {
        Self::Catalog {
            catalog: Catalog::FrameRateVariation,
            indices: None,
        }
    }
}

impl VariantSelection {
    /// Look every variant up. Bad catalog indices fail here, before any
    /// trial starts.
    pub fn resolve(&self) -> Result<Vec<TrialEntry>> {
        match self {
            Self::Catalog { catalog, indices } => {
                let ids: Vec<usize> = match indices {
                    Some(ids) => ids.clone(),
                    None => (0..catalog.len()).collect(),
                };
                ids.into_iter()
                    .map(|id| {
                        Ok(TrialEntry {
                            id,
                            variant: catalog.variant(id)?,
                        })
                    })
                    .collect()
            }
            Self::Explicit { variants } => variants
                .iter()
                .enumerate()
                .map(|(id, variant)| {
                    variant.validate()?;
                    Ok(TrialEntry {
                        id,
                        variant: variant.clone(),
                    })
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Schema version for migration.
    pub version: u32,
    pub content: ContentSettings,
    pub variants: VariantSelection,
    /// Directory for presentation orders and result logs.
    pub result_dir: PathBuf,
    /// Seed for the presentation order; unseeded sessions keep catalog order.
    pub shuffle_seed: Option<u64>,
    pub player: PlayerConfig,
    /// Unscored warm-up variants played in listed order before the trials.
    pub training: Vec<VariantSpec>,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            content: ContentSettings::default(),
            variants: VariantSelection::default(),
            result_dir: PathBuf::from("results"),
            shuffle_seed: None,
            player: PlayerConfig::default(),
            training: Vec::new(),
        }
    }
}

impl ExperimentConfig {
    pub fn validate(&self) -> Result<()> {
        self.player.validate()?;
        self.content.descriptor()?;
        if self.variants.resolve()?.is_empty() {
            return Err(VvError::InvalidParameter(
                "experiment selects no variants".into(),
            ));
        }
        for variant in &self.training {
            variant.validate()?;
        }
        Ok(())
    }

    /// Serialize to JSON bytes.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| {
            VvError::Serialization(format!("Failed to serialize experiment: {}", e))
        })
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| VvError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        if version > CURRENT_VERSION {
            return Err(VvError::Serialization(format!(
                "Experiment file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;
        let config: Self = serde_json::from_value(migrated)
            .map_err(|e| VvError::Serialization(format!("Failed to parse experiment: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 → v1: flat catalog fields move under `variants`
                if let Some(map) = data.as_object_mut() {
                    let catalog = map.remove("catalog");
                    let indices = map.remove("variant_indices");
                    if let Some(catalog) = catalog {
                        map.insert(
                            "variants".into(),
                            serde_json::json!({
                                "source": "catalog",
                                "catalog": catalog,
                                "indices": indices,
                            }),
                        );
                    }
                    map.insert("version".into(), serde_json::json!(1));
                }
                debug!("Migrated experiment file from version 0");
                version = 1;
            }
            _ => {
                return Err(VvError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExperimentConfig::default();
        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(config.content.name, "longdress");
        assert_eq!(config.variants.resolve().unwrap().len(), 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_roundtrip() {
        let config = ExperimentConfig {
            variants: VariantSelection::Explicit {
                variants: vec![VariantSpec::baseline(30), VariantSpec::stall(&[(60, 7)])],
            },
            shuffle_seed: Some(9),
            training: vec![VariantSpec::looping(30, 2), VariantSpec::baseline(15)],
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        let loaded = ExperimentConfig::from_json(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let json = br#"{"version": 1, "content": {"name": "loot", "last_frame": 149}}"#;
        let config = ExperimentConfig::from_json(json).unwrap();
        assert_eq!(config.content.name, "loot");
        assert_eq!(config.content.last_frame, 149);
        assert_eq!(config.content.fps, 30);
        assert_eq!(config.player.buffer_capacity, 20);
        assert!(config.training.is_empty());
    }

    #[test]
    fn test_invalid_training_variant_rejected() {
        let config = ExperimentConfig {
            training: vec![VariantSpec::looping(30, 0)],
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(VvError::InvalidVariant(_))));
    }

    #[test]
    fn test_migration_v0() {
        let json = serde_json::json!({
            "catalog": "stall",
            "variant_indices": [0, 5, 32],
            "result_dir": "out",
        });
        let data = serde_json::to_vec(&json).unwrap();
        let config = ExperimentConfig::from_json(&data).unwrap();

        assert_eq!(config.version, CURRENT_VERSION);
        assert_eq!(
            config.variants,
            VariantSelection::Catalog {
                catalog: Catalog::Stall,
                indices: Some(vec![0, 5, 32]),
            }
        );
        assert_eq!(config.result_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_future_version_rejected() {
        let data = serde_json::to_vec(&serde_json::json!({ "version": 999 })).unwrap();
        assert!(matches!(
            ExperimentConfig::from_json(&data),
            Err(VvError::Serialization(_))
        ));
    }

    #[test]
    fn test_bad_catalog_index_rejected() {
        let selection = VariantSelection::Catalog {
            catalog: Catalog::VersionSwitch,
            indices: Some(vec![1, 29]),
        };
        assert!(matches!(
            selection.resolve(),
            Err(VvError::InvalidVariantIndex { index: 29, .. })
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.json");
        let config = ExperimentConfig::default();
        config.save_to_file(&path).unwrap();
        assert_eq!(ExperimentConfig::load_from_file(&path).unwrap(), config);
    }
}
