//! Registry integration tests: loading the fixture table tree from disk.

use rand::rngs::StdRng;
use rand::SeedableRng;
use rpgen::core::registry::{Form, NodeKind, RegistryCell, RegistryError, TableRegistry};
use rpgen::core::table::TableError;
use rpgen::io::read_directory;
use std::sync::Arc;

const TABLES: &str = "tests/fixtures/tables";

fn load() -> TableRegistry {
    TableRegistry::from_directory(read_directory(TABLES).unwrap())
}

#[test]
fn fixture_tree_lists_every_good_table() {
    let registry = load();
    assert_eq!(registry.root().name(), "tables");
    let tables: Vec<String> = registry.tables().iter().map(|p| p.join("/")).collect();
    assert_eq!(
        tables,
        vec![
            "city/Districts",
            "city/Government",
            "encounters/Forest Encounters",
            "treasure/Gems",
        ]
    );
    assert_eq!(
        registry.children(&["city"]).unwrap(),
        vec!["Districts", "Government"]
    );
}

#[test]
fn percentile_table_covers_one_to_hundred() {
    let registry = load();
    let government = registry.get(&["City", "GOVERNMENT"]).unwrap();
    assert_eq!(government.max_roll(), 100);
    assert_eq!(government.entries().len(), 20);

    let at = |n| registry.roll_die(&["city", "government"], n).unwrap().entry.get("Government");
    assert_eq!(at(1), Some("Autocracy"));
    assert_eq!(at(8), Some("Autocracy"));
    assert_eq!(at(9), Some("Bureaucracy"));
    assert_eq!(at(95), Some("Kleptocracy"));
    assert_eq!(at(96), Some("Theocracy"));
    assert_eq!(at(100), Some("Theocracy"));

    let last = government.entries().last().unwrap();
    assert_eq!(last.roll_label(), "96-00");
    assert_eq!(last.rolls(), 96..=100);
}

#[test]
fn percentile_weights_show_in_draws() {
    let registry = load();
    let government = registry.get(&["city", "government"]).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);
    let n = 100_000;
    let feudal = (0..n)
        .filter(|_| government.draw(&mut rng).unwrap().get("Government") == Some("Feudalism"))
        .count();
    let share = feudal as f64 / n as f64;
    assert!((share - 0.15).abs() < 0.01, "feudalism share {}", share);
}

#[test]
fn unnumbered_rows_count_up_from_one() {
    let registry = load();
    let districts = registry.get(&["city", "districts"]).unwrap();
    assert_eq!(districts.max_roll(), 4);
    assert_eq!(
        districts.roll_die(3).unwrap().get("District"),
        Some("Temple Row")
    );
    assert_eq!(
        districts.roll_die(1).unwrap().get("Feature"),
        Some("Smugglers' warehouses")
    );
}

#[test]
fn bad_lines_are_skipped_and_rolls_follow_the_counter() {
    let registry = load();
    let forest = registry.get(&["encounters", "forest encounters"]).unwrap();
    let names: Vec<&str> = forest
        .entries()
        .iter()
        .filter_map(|e| e.get("Encounter"))
        .collect();
    assert_eq!(names, vec!["Wolves", "Owlbear", "Hag"]);

    // Owlbear is labelled 4-6 but follows two wolf rolls.
    let owlbear = &forest.entries()[1];
    assert_eq!(owlbear.roll_label(), "4-6");
    assert_eq!(owlbear.rolls(), 3..=5);
    assert_eq!(forest.max_roll(), 6);
    assert_eq!(forest.roll_die(6).unwrap().get("Encounter"), Some("Hag"));
}

#[test]
fn structured_form_wins_over_stale_text() {
    let registry = load();
    let node = registry.node(&["treasure", "gems"]).unwrap();
    assert!(matches!(
        node.kind(),
        NodeKind::Leaf {
            form: Form::Structured,
            ..
        }
    ));
    let gems = node.table().unwrap();
    assert_eq!(gems.max_roll(), 6);
    assert!(gems.entries().iter().all(|e| e.get("Gem") != Some("Quartz")));
    assert_eq!(gems.roll_die(6).unwrap().get("Value"), Some("5000 gp"));

    let derived: Vec<&str> = registry.derived_tables().iter().map(|n| n.name()).collect();
    assert_eq!(derived, vec!["Districts", "Government", "Forest Encounters"]);
}

#[test]
fn broken_leaf_is_recorded_not_fatal() {
    let registry = load();
    let failures = registry.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].path, vec!["misc".to_string(), "Bad".to_string()]);
    assert!(matches!(
        failures[0].error,
        RegistryError::Table(TableError::DuplicateColumn(ref c)) if c == "Name"
    ));
    assert!(registry.children(&["misc"]).unwrap().is_empty());
    assert!(matches!(
        registry.get(&["misc", "bad"]),
        Err(RegistryError::NotFound(_))
    ));
}

#[test]
fn loading_twice_keeps_one_copy() {
    let mut registry = load();
    registry.register(read_directory(TABLES).unwrap());
    assert_eq!(registry.tables().len(), 4);
    assert_eq!(registry.children(&["city"]).unwrap().len(), 2);
}

#[test]
fn categories_are_not_tables() {
    let registry = load();
    assert!(matches!(
        registry.get(&["city"]),
        Err(RegistryError::NotFound(ref p)) if p == "city"
    ));
    let mut rng = StdRng::seed_from_u64(1);
    assert!(registry.roll(&["city", "nowhere"], &mut rng).is_err());
}

static SHARED: RegistryCell = RegistryCell::new();

#[test]
fn shared_registry_is_built_once_across_threads() {
    let builds = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let builds = Arc::clone(&builds);
            std::thread::spawn(move || {
                let registry = SHARED.get_or_build(|| {
                    builds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                    load()
                });
                registry.tables().len()
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 4);
    }
    assert_eq!(builds.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert!(SHARED.get().is_some());
}
