//! rpgen: roll tables, invent names and generate cities from the terminal.
//!
//! Set `RUST_LOG=debug` to see registration decisions.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use rpgen::core::city::CityError;
use rpgen::core::registry::TableRegistry;
use rpgen::core::toolkit::{Toolkit, ToolkitConfig, ToolkitError};
use rpgen::io;
use rpgen::schema::city::{CityOptions, Species};

#[derive(Parser)]
#[command(
    name = "rpgen",
    about = "Random tables, names and cities for tabletop games",
    version,
    propagate_version = true
)]
struct Cli {
    /// RON config with data paths and seed
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory of table files (overrides the config)
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    /// Given-name corpus, `name:frequency` pairs
    #[arg(long, global = true)]
    given: Option<PathBuf>,

    /// Family-name corpus, `name:frequency` pairs
    #[arg(long, global = true)]
    family: Option<PathBuf>,

    /// City word lists (RON)
    #[arg(long, global = true)]
    city_data: Option<PathBuf>,

    /// RNG seed (default: from config, else time-based)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every table, and any that failed to load
    Tables,

    /// Roll on a table, e.g. `rpgen roll city/government`
    Roll {
        /// Slash-separated table path (case-insensitive)
        path: String,

        /// Look up this die value instead of rolling
        #[arg(short, long)]
        die: Option<u64>,

        /// Number of rolls
        #[arg(short = 'n', long, default_value = "1")]
        times: usize,
    },

    /// Generate full names
    Names {
        #[arg(short = 'n', long, default_value = "10")]
        count: usize,
    },

    /// Generate a city
    City {
        /// Base head count of the first species
        #[arg(long, default_value = "5000")]
        size: f64,

        /// 0.0 (one species dominates) to 1.0 (even mix)
        #[arg(long, default_value = "0.5")]
        diversity: f64,

        /// First species, e.g. dwarf or half-elf
        #[arg(long)]
        species: Option<String>,
    },

    /// Write the JSON form of text tables that lack one
    Convert {
        /// Table directory (default: --tables or the config's tables_dir)
        dir: Option<PathBuf>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), ToolkitError> {
    let mut config = match cli.config {
        Some(ref path) => ToolkitConfig::load(path)?,
        None => ToolkitConfig::default(),
    };
    if cli.tables.is_some() {
        config.tables_dir = cli.tables;
    }
    if cli.given.is_some() {
        config.given_names = cli.given;
    }
    if cli.family.is_some() {
        config.family_names = cli.family;
    }
    if cli.city_data.is_some() {
        config.city_data = cli.city_data;
    }
    match cli.seed {
        Some(seed) => config.seed = seed,
        None if cli.config.is_none() => config.seed = time_seed(),
        None => {}
    }

    if let Commands::Convert { dir } = cli.command {
        let dir = dir
            .or(config.tables_dir)
            .ok_or(ToolkitError::NotConfigured("table directory"))?;
        let registry = TableRegistry::from_directory(io::read_directory(&dir)?);
        report_failures(&registry);
        let written = io::persist_derived(&registry, &dir)?;
        println!("wrote {} file(s)", written.len());
        for path in written {
            println!("  {}", path.display());
        }
        return Ok(());
    }

    let mut toolkit = Toolkit::builder().config(&config).build()?;

    match cli.command {
        Commands::Tables => {
            for path in toolkit.registry().tables() {
                println!("{}", path.join("/"));
            }
            report_failures(toolkit.registry());
        }
        Commands::Roll { path, die, times } => {
            let path: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
            for _ in 0..times {
                let (roll, entry) = match die {
                    Some(n) => (n, toolkit.roll_table_die(path.as_slice(), n)?),
                    None => toolkit.roll_table(path.as_slice())?,
                };
                let values: Vec<&str> = entry.values().collect();
                println!("{:>4}  {}", roll, values.join(" | "));
            }
        }
        Commands::Names { count } => {
            for name in toolkit.names(count)? {
                println!("{}", name);
            }
        }
        Commands::City {
            size,
            diversity,
            species,
        } => {
            let species = match species {
                Some(label) => Some(Species::from_label(&label).ok_or_else(|| {
                    CityError::InvalidOptions(format!("unknown species '{}'", label))
                })?),
                None => None,
            };
            let options = CityOptions {
                size,
                diversity,
                species,
            };
            let city = toolkit.generate_city(&options)?;
            print_city(&city);
        }
        Commands::Convert { .. } => {}
    }
    Ok(())
}

fn report_failures(registry: &TableRegistry) {
    for failure in registry.failures() {
        eprintln!("skipped {}: {}", failure.path.join("/"), failure.error);
    }
}

fn print_city(city: &rpgen::schema::city::City) {
    println!("{}", city.name);
    println!(
        "  population {} (search {:+})",
        city.population.total, city.population.search_mod
    );
    for (species, count) in &city.population.people {
        println!("    {:<10} {}", species.label(), count);
    }
    println!("  ruled by {} ({})", city.ruler.name, city.ruler.species);
    if !city.inns.is_empty() {
        println!("  inns:");
        for inn in &city.inns {
            println!("    {}", inn);
        }
    }
    if !city.guilds.is_empty() {
        println!("  guilds:");
        for guild in &city.guilds {
            println!("    {}", guild);
        }
    }
}

fn time_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
