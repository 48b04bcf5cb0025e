//! Settings file support.
//!
//! An optional TOML file supplies defaults that command line flags override:
//!
//! ```toml
//! reference = "genotypes_by_rsid.zip"
//! output_dir = "./reports"
//! page_size = 20
//!
//! [filter]
//! reputes = ["good", "bad"]
//! min_magnitude = 1.5
//! query = ""
//! ```

use anyhow::{bail, Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::filter::PAGE_SIZE;
use crate::types::{FilterCriteria, Repute, ReputeSet};

/// Looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "dna-insights.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub reference: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub page_size: usize,
    pub filter: FilterSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference: None,
            output_dir: PathBuf::from("./reports"),
            page_size: PAGE_SIZE,
            filter: FilterSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterSettings {
    #[serde(deserialize_with = "strict_reputes")]
    pub reputes: Vec<Repute>,
    pub min_magnitude: f64,
    pub query: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            reputes: vec![Repute::Good, Repute::Bad, Repute::Neutral],
            min_magnitude: 0.0,
            query: String::new(),
        }
    }
}

/// Unlike reference entries, a settings file must name reputes exactly
fn strict_reputes<'de, D>(deserializer: D) -> std::result::Result<Vec<Repute>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<String>::deserialize(deserializer)?
        .iter()
        .map(|label| match label.trim().to_ascii_lowercase().as_str() {
            "good" => Ok(Repute::Good),
            "bad" => Ok(Repute::Bad),
            "neutral" => Ok(Repute::Neutral),
            _ => Err(<D::Error as de::Error>::custom(format!(
                "unknown repute `{}`, expected good, bad or neutral",
                label
            ))),
        })
        .collect()
}

/// Reject filter values that would silently disable a filter
pub fn validate_criteria(criteria: &FilterCriteria) -> Result<()> {
    if !criteria.min_magnitude.is_finite() {
        bail!(
            "min_magnitude must be a finite number, got {}",
            criteria.min_magnitude
        );
    }
    Ok(())
}

impl FilterSettings {
    pub fn to_criteria(&self) -> FilterCriteria {
        FilterCriteria {
            reputes: ReputeSet::from_reputes(&self.reputes),
            min_magnitude: self.min_magnitude,
            query: self.query.clone(),
        }
    }
}

impl Settings {
    /// Load `path`, or [`DEFAULT_CONFIG_FILE`] if present, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let settings = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Reading settings from {}", path.display());
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            bail!("page_size must be at least 1");
        }
        validate_criteria(&self.filter.to_criteria())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_keeps_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("insights.toml");
        fs::write(
            &path,
            "reference = \"snps.zip\"\n\n[filter]\nreputes = [\"bad\"]\nmin_magnitude = 2.5\n",
        )?;

        let settings = Settings::load(Some(&path))?;
        assert_eq!(settings.reference, Some(PathBuf::from("snps.zip")));
        assert_eq!(settings.page_size, PAGE_SIZE);
        assert_eq!(settings.output_dir, PathBuf::from("./reports"));

        let criteria = settings.filter.to_criteria();
        assert!(criteria.reputes.contains(Repute::Bad));
        assert!(!criteria.reputes.contains(Repute::Good));
        assert_eq!(criteria.min_magnitude, 2.5);
        assert!(criteria.query.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_settings_are_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let zero_page = temp_dir.path().join("zero.toml");
        fs::write(&zero_page, "page_size = 0\n")?;
        assert!(Settings::load(Some(&zero_page)).is_err());

        let unknown = temp_dir.path().join("unknown.toml");
        fs::write(&unknown, "colour = \"blue\"\n")?;
        assert!(Settings::load(Some(&unknown)).is_err());

        let missing = temp_dir.path().join("missing.toml");
        assert!(Settings::load(Some(&missing)).is_err());
        Ok(())
    }

    #[test]
    fn test_repute_labels_must_be_known() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let typo = temp_dir.path().join("typo.toml");
        fs::write(&typo, "[filter]\nreputes = [\"goood\"]\n")?;
        let err = Settings::load(Some(&typo)).unwrap_err();
        assert!(format!("{:#}", err).contains("goood"));

        let cased = temp_dir.path().join("cased.toml");
        fs::write(&cased, "[filter]\nreputes = [\"Good\", \" NEUTRAL \"]\n")?;
        let settings = Settings::load(Some(&cased))?;
        assert_eq!(settings.filter.reputes, vec![Repute::Good, Repute::Neutral]);
        Ok(())
    }

    #[test]
    fn test_non_finite_magnitude_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nan.toml");
        fs::write(&path, "[filter]\nmin_magnitude = nan\n")?;
        assert!(Settings::load(Some(&path)).is_err());

        for min_magnitude in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let criteria = FilterCriteria {
                min_magnitude,
                ..FilterCriteria::default()
            };
            assert!(validate_criteria(&criteria).is_err());
        }
        assert!(validate_criteria(&FilterCriteria::default()).is_ok());
        Ok(())
    }

    #[test]
    fn test_default_criteria_show_everything() {
        assert_eq!(Settings::default().filter.to_criteria(), FilterCriteria::default());
    }
}
