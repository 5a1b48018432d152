//! Settlement generation: name, population mix, ruler, inns and guilds.

use rand::{Rng, RngCore};
use thiserror::Error;

use crate::core::names::{NameError, NameGenerator};
use crate::core::template::{FnSubstitution, TemplateError, TemplateFiller};
use crate::core::weighted::{SamplerError, WeightedSampler};
use crate::schema::city::{City, CityData, CityOptions, Population, Ruler, Species};

#[derive(Debug, Error)]
pub enum CityError {
    #[error("city data list '{0}' is empty")]
    EmptyList(&'static str),
    #[error("invalid city options: {0}")]
    InvalidOptions(String),
    #[error("name error: {0}")]
    Name(#[from] NameError),
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
    #[error("sampler error: {0}")]
    Sampler(#[from] SamplerError),
}

/// Search modifier by population, as `(ceiling, modifier)`. Populations
/// above the last ceiling get [`MAX_SEARCH_MOD`].
const SEARCH_MODS: [(u32, i32); 6] = [
    (0, -6),
    (500, -4),
    (1500, -2),
    (4500, 0),
    (6750, 1),
    (26500, 3),
];
const MAX_SEARCH_MOD: i32 = 5;

/// Species present in every city.
const MIN_SPECIES: usize = 3;

/// Chance that a city or innkeeper keeps the family name.
const FULL_NAME_CHANCE: f64 = 0.2;

pub fn search_mod(total: u32) -> i32 {
    SEARCH_MODS
        .iter()
        .find(|(ceiling, _)| total <= *ceiling)
        .map_or(MAX_SEARCH_MOD, |(_, m)| *m)
}

/// Word lists from [`CityData`] turned into samplers.
#[derive(Debug, Clone)]
pub struct CityGenerator {
    inn_beg: WeightedSampler<String>,
    inn_beg_pat: WeightedSampler<String>,
    inn_end: WeightedSampler<String>,
    inn_end_pat: WeightedSampler<String>,
    guild_pat: WeightedSampler<String>,
    guild_group: WeightedSampler<String>,
    guild_noun: WeightedSampler<String>,
}

fn word_list(words: &[String], label: &'static str) -> Result<WeightedSampler<String>, CityError> {
    if words.is_empty() {
        return Err(CityError::EmptyList(label));
    }
    Ok(WeightedSampler::uniform(words.iter().cloned()))
}

impl CityGenerator {
    pub fn new(data: &CityData) -> Result<Self, CityError> {
        Ok(Self {
            inn_beg: word_list(&data.inns.beg, "inns.beg")?,
            inn_beg_pat: word_list(&data.inns.beg_pat, "inns.beg_pat")?,
            inn_end: word_list(&data.inns.end, "inns.end")?,
            inn_end_pat: word_list(&data.inns.end_pat, "inns.end_pat")?,
            guild_pat: word_list(&data.guilds.pat, "guilds.pat")?,
            guild_group: word_list(&data.guilds.group, "guilds.group")?,
            guild_noun: word_list(&data.guilds.noun, "guilds.noun")?,
        })
    }

    pub fn generate<R: Rng>(
        &self,
        names: &NameGenerator,
        options: &CityOptions,
        rng: &mut R,
    ) -> Result<City, CityError> {
        validate(options)?;

        let city_name = short_or_full_name(names, rng)?;
        let ruler_name = names.full_name(rng)?;

        let first = options.species.unwrap_or_else(|| random_species(rng));
        let mut population = Population::default();
        add_population(&mut population, options, first, rng);
        while population.people.len() < MIN_SPECIES {
            let species = random_species(rng);
            add_population(&mut population, options, species, rng);
        }

        let ruler = Ruler {
            name: ruler_name,
            species: ruler_species(&population, first, rng)?,
        };
        let inns = self.inns(names, population.total, rng)?;
        let guilds = self.guilds(population.total, rng)?;

        log::debug!(
            "generated city '{}' with {} people, {} inns, {} guilds",
            city_name,
            population.total,
            inns.len(),
            guilds.len()
        );

        Ok(City {
            name: city_name,
            population,
            ruler,
            inns,
            guilds,
        })
    }

    /// `ceil(population^(1/4))` inn names.
    fn inns<R: Rng>(&self, names: &NameGenerator, total: u32, rng: &mut R) -> Result<Vec<String>, CityError> {
        let count = f64::from(total).sqrt().sqrt().ceil() as usize;
        let person = FnSubstitution(|rng: &mut dyn RngCore| -> Result<String, TemplateError> {
            short_or_full_name(names, rng).map_err(|e| TemplateError::Substitution(Box::new(e)))
        });
        let filler = TemplateFiller::new()
            .bind('a', &self.inn_beg)
            .bind('n', &self.inn_end)
            .bind('p', &person);

        let mut inns = Vec::with_capacity(count);
        for _ in 0..count {
            let pattern = format!(
                "{} {}",
                self.inn_beg_pat.draw(rng)?,
                self.inn_end_pat.draw(rng)?
            );
            inns.push(filler.fill(&pattern, rng)?);
        }
        Ok(inns)
    }

    /// One guild per 2000 to 2499 residents past the first such block.
    fn guilds<R: Rng>(&self, total: u32, rng: &mut R) -> Result<Vec<String>, CityError> {
        let filler = TemplateFiller::new()
            .bind('g', &self.guild_group)
            .bind('n', &self.guild_noun);

        let mut guilds = Vec::new();
        let mut remaining = i64::from(total) - rng.gen_range(2000..2500);
        while remaining > 0 {
            remaining -= rng.gen_range(2000..2500);
            let pattern = self.guild_pat.draw(rng)?;
            guilds.push(filler.fill(pattern, rng)?);
        }
        Ok(guilds)
    }
}

fn validate(options: &CityOptions) -> Result<(), CityError> {
    if !options.size.is_finite() || options.size < 0.0 {
        return Err(CityError::InvalidOptions(format!(
            "size must be a non-negative number, got {}",
            options.size
        )));
    }
    if !(0.0..=1.0).contains(&options.diversity) {
        return Err(CityError::InvalidOptions(format!(
            "diversity must be within 0.0..=1.0, got {}",
            options.diversity
        )));
    }
    Ok(())
}

/// The given name alone most of the time, otherwise given and family.
fn short_or_full_name<R: Rng + ?Sized>(names: &NameGenerator, rng: &mut R) -> Result<String, NameError> {
    let given = names.given_name(rng)?;
    if rng.gen_bool(FULL_NAME_CHANCE) {
        let family = names.family_name(rng)?;
        return Ok(format!("{} {}", given, family));
    }
    Ok(given)
}

fn random_species<R: Rng + ?Sized>(rng: &mut R) -> Species {
    Species::ALL[rng.gen_range(0..Species::ALL.len())]
}

/// Add `species` scaled down by `diversity` once per species already
/// present. Returns false if it was already there.
fn add_population<R: Rng + ?Sized>(
    population: &mut Population,
    options: &CityOptions,
    species: Species,
    rng: &mut R,
) -> bool {
    if population.people.contains_key(&species) {
        return false;
    }
    let base = options.size * (rng.gen::<f64>() + 0.5);
    let present = population.people.len() as i32;
    let count = (base.trunc() * options.diversity.powi(present)) as u32;

    population.people.insert(species, count);
    population.total = population.total.saturating_add(count);
    population.search_mod = search_mod(population.total);
    true
}

fn ruler_species<R: Rng + ?Sized>(
    population: &Population,
    fallback: Species,
    rng: &mut R,
) -> Result<Species, CityError> {
    let weighted: WeightedSampler<Species> = WeightedSampler::from_weighted(
        population
            .people
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(species, count)| (*count, *species)),
    )?;
    if weighted.is_empty() {
        return Ok(fallback);
    }
    Ok(*weighted.draw(rng)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::city::{GuildData, InnData};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    fn data() -> CityData {
        CityData {
            inns: InnData {
                beg: strings(&["Prancing"]),
                beg_pat: strings(&["The {a}"]),
                end: strings(&["Pony"]),
                end_pat: strings(&["{n}"]),
            },
            guilds: GuildData {
                pat: strings(&["{g} of {n}"]),
                group: strings(&["Guild"]),
                noun: strings(&["Smiths"]),
            },
        }
    }

    fn names() -> NameGenerator {
        NameGenerator::from_corpus_text("Al:1", "Bo:1").unwrap()
    }

    #[test]
    fn search_mod_thresholds() {
        assert_eq!(search_mod(0), -6);
        assert_eq!(search_mod(1), -4);
        assert_eq!(search_mod(500), -4);
        assert_eq!(search_mod(501), -2);
        assert_eq!(search_mod(4500), 0);
        assert_eq!(search_mod(6750), 1);
        assert_eq!(search_mod(20000), 3);
        assert_eq!(search_mod(26501), 5);
    }

    #[test]
    fn city_has_three_species_and_consistent_totals() {
        let gen = CityGenerator::new(&data()).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let city = gen
            .generate(&names(), &CityOptions::default(), &mut rng)
            .unwrap();

        assert_eq!(city.population.people.len(), 3);
        let sum: u32 = city.population.people.values().sum();
        assert_eq!(sum, city.population.total);
        assert_eq!(city.population.search_mod, search_mod(sum));
        assert!(city.population.people.contains_key(&city.ruler.species));
        assert_eq!(city.ruler.name, "Al Bo");
        assert!(city.name == "Al" || city.name == "Al Bo");
    }

    #[test]
    fn dominant_species_is_included() {
        let gen = CityGenerator::new(&data()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let options = CityOptions {
            species: Some(Species::Dwarf),
            ..CityOptions::default()
        };
        let city = gen.generate(&names(), &options, &mut rng).unwrap();
        assert!(city.population.people.contains_key(&Species::Dwarf));
    }

    #[test]
    fn inns_and_guilds_scale_with_population() {
        let gen = CityGenerator::new(&data()).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let options = CityOptions {
            size: 20000.0,
            diversity: 1.0,
            species: None,
        };
        let city = gen.generate(&names(), &options, &mut rng).unwrap();

        let expected_inns = f64::from(city.population.total).sqrt().sqrt().ceil() as usize;
        assert_eq!(city.inns.len(), expected_inns);
        assert!(city.inns.iter().all(|inn| inn == "The Prancing Pony"));

        // each species starts at half the base size or more
        assert!(city.population.total >= 30000);
        assert!(city.guilds.len() >= 11);
        assert!(city.guilds.iter().all(|g| g == "Guild of Smiths"));
    }

    #[test]
    fn empty_town_has_no_inns_or_guilds() {
        let gen = CityGenerator::new(&data()).unwrap();
        let mut rng = StdRng::seed_from_u64(9);
        let options = CityOptions {
            size: 0.0,
            diversity: 0.5,
            species: Some(Species::Gnome),
        };
        let city = gen.generate(&names(), &options, &mut rng).unwrap();
        assert_eq!(city.population.total, 0);
        assert_eq!(city.population.search_mod, -6);
        assert_eq!(city.ruler.species, Species::Gnome);
        assert!(city.inns.is_empty());
        assert!(city.guilds.is_empty());
    }

    #[test]
    fn innkeeper_names_fill_person_tags() {
        let mut d = data();
        d.inns.beg_pat = strings(&["{p}'s"]);
        let gen = CityGenerator::new(&d).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let city = gen
            .generate(&names(), &CityOptions::default(), &mut rng)
            .unwrap();
        assert!(!city.inns.is_empty());
        for inn in &city.inns {
            assert!(inn == "Al's Pony" || inn == "Al Bo's Pony", "{}", inn);
        }
    }

    #[test]
    fn bad_inputs_are_rejected() {
        let mut d = data();
        d.guilds.noun.clear();
        assert!(matches!(
            CityGenerator::new(&d),
            Err(CityError::EmptyList("guilds.noun"))
        ));

        let gen = CityGenerator::new(&data()).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let options = CityOptions {
            diversity: 1.5,
            ..CityOptions::default()
        };
        assert!(matches!(
            gen.generate(&names(), &options, &mut rng),
            Err(CityError::InvalidOptions(_))
        ));
    }

    #[test]
    fn same_seed_same_city() {
        let gen = CityGenerator::new(&data()).unwrap();
        let a = gen
            .generate(&names(), &CityOptions::default(), &mut StdRng::seed_from_u64(77))
            .unwrap();
        let b = gen
            .generate(&names(), &CityOptions::default(), &mut StdRng::seed_from_u64(77))
            .unwrap();
        assert_eq!(a, b);
    }
}
