use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Playable species a settlement can be populated with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Species {
    Human,
    Elf,
    Dwarf,
    Halfling,
    Gnome,
    HalfElf,
    HalfOrc,
    Dragonborn,
    Tiefling,
}

impl Species {
    pub const ALL: [Species; 9] = [
        Species::Human,
        Species::Elf,
        Species::Dwarf,
        Species::Halfling,
        Species::Gnome,
        Species::HalfElf,
        Species::HalfOrc,
        Species::Dragonborn,
        Species::Tiefling,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Elf => "elf",
            Self::Dwarf => "dwarf",
            Self::Halfling => "halfling",
            Self::Gnome => "gnome",
            Self::HalfElf => "half-elf",
            Self::HalfOrc => "half-orc",
            Self::Dragonborn => "dragonborn",
            Self::Tiefling => "tiefling",
        }
    }

    /// Parse a label as written by [`Species::label`] or the variant name,
    /// ignoring case.
    pub fn from_label(label: &str) -> Option<Species> {
        let wanted = label.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
        Self::ALL
            .into_iter()
            .find(|s| s.label().replace('-', "") == wanted)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Head count per species plus derived totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Population {
    pub people: BTreeMap<Species, u32>,
    pub total: u32,
    /// Modifier applied to checks for finding goods or people in town.
    pub search_mod: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ruler {
    pub name: String,
    pub species: Species,
}

/// A generated settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub population: Population,
    pub ruler: Ruler,
    pub inns: Vec<String>,
    pub guilds: Vec<String>,
}

/// Word lists and patterns for inn names.
///
/// A name is one `beg_pat` and one `end_pat` joined by a space. Patterns
/// use `{a}` for a `beg` word, `{n}` for an `end` word and `{p}` for a
/// person's name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InnData {
    pub beg: Vec<String>,
    pub beg_pat: Vec<String>,
    pub end: Vec<String>,
    pub end_pat: Vec<String>,
}

/// Word lists and patterns for guild names: `{g}` for a group word and
/// `{n}` for a noun.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GuildData {
    pub pat: Vec<String>,
    pub group: Vec<String>,
    pub noun: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityData {
    pub inns: InnData,
    pub guilds: GuildData,
}

/// Knobs for a single city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityOptions {
    /// Base head count for the first species.
    pub size: f64,
    /// Multiplier in `0.0..=1.0` applied once per species already present.
    pub diversity: f64,
    /// First species added; random when unset.
    pub species: Option<Species>,
}

impl Default for CityOptions {
    fn default() -> Self {
        Self {
            size: 5000.0,
            diversity: 0.5,
            species: None,
        }
    }
}
