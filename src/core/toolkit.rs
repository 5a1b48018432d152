//! The toolkit: one seeded entry point over tables, names and cities.
//!
//! Loads everything up front, then serves rolls and generated content
//! from its own RNG so a fixed seed replays the same session.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::city::{CityError, CityGenerator};
use crate::core::names::{NameError, NameGenerator, PhoneticNameSynthesizer};
use crate::core::registry::{RegistryError, TableRegistry};
use crate::core::table::Entry;
use crate::core::template::{Substitution, TemplateError, TemplateFiller};
use crate::io::{self, IoError};
use crate::schema::city::{City, CityData, CityOptions};

#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("name error: {0}")]
    Name(#[from] NameError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("city error: {0}")]
    City(#[from] CityError),
    #[error("{0}")]
    Io(#[from] IoError),
    #[error("IO error: {0}")]
    StdIo(#[from] std::io::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

/// File locations and seed, read from RON.
///
/// ```ron
/// (
///     tables_dir: Some("data/tables"),
///     given_names: Some("data/given.txt"),
///     family_names: Some("data/family.txt"),
///     city_data: Some("data/city.ron"),
///     seed: 7,
/// )
/// ```
///
/// Relative paths are resolved against the config file's directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    pub tables_dir: Option<PathBuf>,
    pub given_names: Option<PathBuf>,
    pub family_names: Option<PathBuf>,
    pub city_data: Option<PathBuf>,
    pub seed: u64,
}

impl ToolkitConfig {
    pub fn load(path: &Path) -> Result<Self, ToolkitError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: ToolkitConfig = ron::from_str(&contents)?;
        if let Some(base) = path.parent() {
            for field in [
                &mut config.tables_dir,
                &mut config.given_names,
                &mut config.family_names,
                &mut config.city_data,
            ] {
                if let Some(p) = field.as_mut() {
                    if p.is_relative() {
                        *p = base.join(&*p);
                    }
                }
            }
        }
        Ok(config)
    }
}

/// Built via `Toolkit::builder()` or `Toolkit::from_config(path)`.
pub struct Toolkit {
    registry: TableRegistry,
    names: Option<NameGenerator>,
    cities: Option<CityGenerator>,
    rng: StdRng,
}

pub struct ToolkitBuilder {
    tables_dir: Option<PathBuf>,
    given_names_path: Option<PathBuf>,
    family_names_path: Option<PathBuf>,
    city_data_path: Option<PathBuf>,
    seed: u64,
    /// Directly provided registry (for testing without files).
    registry: Option<TableRegistry>,
    /// Directly provided name models (for testing without files).
    names: Option<NameGenerator>,
    /// Directly provided city data (for testing without files).
    city_data: Option<CityData>,
}

impl Toolkit {
    pub fn builder() -> ToolkitBuilder {
        ToolkitBuilder {
            tables_dir: None,
            given_names_path: None,
            family_names_path: None,
            city_data_path: None,
            seed: 0,
            registry: None,
            names: None,
            city_data: None,
        }
    }

    pub fn from_config(path: impl AsRef<Path>) -> Result<Self, ToolkitError> {
        let config = ToolkitConfig::load(path.as_ref())?;
        Self::builder().config(&config).build()
    }

    pub fn registry(&self) -> &TableRegistry {
        &self.registry
    }

    /// Roll the table at `path` (display names) with the toolkit's RNG.
    pub fn roll_table<S: AsRef<str>>(&mut self, path: &[S]) -> Result<(u64, &Entry), ToolkitError> {
        let rolled = self.registry.roll(path, &mut self.rng)?;
        Ok((rolled.roll, rolled.entry))
    }

    /// Look up an explicit die value on the table at `path`.
    pub fn roll_table_die<S: AsRef<str>>(&self, path: &[S], roll: u64) -> Result<&Entry, ToolkitError> {
        Ok(self.registry.roll_die(path, roll)?.entry)
    }

    /// `count` full names.
    pub fn names(&mut self, count: usize) -> Result<Vec<String>, ToolkitError> {
        let names = self.names.as_ref().ok_or(ToolkitError::NotConfigured("names"))?;
        Ok(names.names(count, &mut self.rng)?)
    }

    pub fn generate_city(&mut self, options: &CityOptions) -> Result<City, ToolkitError> {
        let names = self.names.as_ref().ok_or(ToolkitError::NotConfigured("names"))?;
        let cities = self
            .cities
            .as_ref()
            .ok_or(ToolkitError::NotConfigured("city data"))?;
        Ok(cities.generate(names, options, &mut self.rng)?)
    }

    /// Fill a pattern. The tag `p` is bound to a full name when names are
    /// configured and `bindings` does not bind it.
    pub fn fill(
        &mut self,
        pattern: &str,
        bindings: &[(char, &dyn Substitution)],
    ) -> Result<String, ToolkitError> {
        let mut filler = TemplateFiller::new();
        if let Some(names) = &self.names {
            filler = filler.bind('p', names);
        }
        for (tag, source) in bindings {
            filler = filler.bind(*tag, *source);
        }
        Ok(filler.fill(pattern, &mut self.rng)?)
    }
}

impl ToolkitBuilder {
    /// Take every path and the seed from a loaded config.
    pub fn config(mut self, config: &ToolkitConfig) -> Self {
        self.tables_dir = config.tables_dir.clone();
        self.given_names_path = config.given_names.clone();
        self.family_names_path = config.family_names.clone();
        self.city_data_path = config.city_data.clone();
        self.seed = config.seed;
        self
    }

    pub fn tables_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.tables_dir = Some(path.into());
        self
    }

    pub fn given_names(mut self, path: impl Into<PathBuf>) -> Self {
        self.given_names_path = Some(path.into());
        self
    }

    pub fn family_names(mut self, path: impl Into<PathBuf>) -> Self {
        self.family_names_path = Some(path.into());
        self
    }

    pub fn city_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.city_data_path = Some(path.into());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Provide a registry directly (for testing without files).
    pub fn with_registry(mut self, registry: TableRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Provide name models directly (for testing without files).
    pub fn with_names(mut self, names: NameGenerator) -> Self {
        self.names = Some(names);
        self
    }

    /// Provide city data directly (for testing without files).
    pub fn with_city_data(mut self, data: CityData) -> Self {
        self.city_data = Some(data);
        self
    }

    pub fn build(self) -> Result<Toolkit, ToolkitError> {
        // Files on disk are merged over a directly provided registry.
        let mut registry = self
            .registry
            .unwrap_or_else(|| TableRegistry::new("tables"));
        if let Some(ref dir) = self.tables_dir {
            registry.register(io::read_directory(dir)?);
        }

        let names = match (self.given_names_path, self.family_names_path) {
            (Some(given), Some(family)) => Some(NameGenerator::new(
                load_synthesizer(&given)?,
                load_synthesizer(&family)?,
            )),
            (None, None) => self.names,
            _ => return Err(ToolkitError::NotConfigured("both name corpora")),
        };

        let city_data = match self.city_data_path {
            Some(ref path) => Some(io::load_city_data(path)?),
            None => self.city_data,
        };
        let cities = city_data.as_ref().map(CityGenerator::new).transpose()?;

        log::info!(
            "toolkit ready: {} tables, {} failed, names {}, cities {}",
            registry.tables().len(),
            registry.failures().len(),
            if names.is_some() { "on" } else { "off" },
            if cities.is_some() { "on" } else { "off" },
        );

        Ok(Toolkit {
            registry,
            names,
            cities,
            rng: StdRng::seed_from_u64(self.seed),
        })
    }
}

fn load_synthesizer(path: &Path) -> Result<PhoneticNameSynthesizer, ToolkitError> {
    let text = std::fs::read_to_string(path)?;
    Ok(PhoneticNameSynthesizer::from_corpus_text(&text)?)
}
