use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;

use clap::Parser;
use probe_hash::HashTable;
use probe_hash::hash_table::Entry;

#[derive(Parser, Debug)]
struct Args {
    #[arg(short = 'c', long = "target_capacity", default_value_t = 1000)]
    target_capacity: usize,

    /// Remove every n-th value after filling, to exercise backward shifts.
    #[arg(short = 'r', long = "remove_every", default_value_t = 0)]
    remove_every: u64,
}

fn hash_u64(value: u64) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn main() -> Result<(), probe_hash::ProbeError> {
    let args = Args::parse();

    println!(
        "Creating HashTable with target capacity: {}",
        args.target_capacity
    );

    let mut table: HashTable<u64> = HashTable::with_capacity(args.target_capacity)?;

    println!("Actual capacity: {}", table.capacity());
    println!("Filling table with u64 values...");

    let num_values = (table.capacity() / 2) as u64;
    for value in 0..num_values {
        let hash = hash_u64(value);

        match table.entry(hash, |&v| v == value) {
            Entry::Vacant(entry) => {
                entry.insert(value)?;
            }
            Entry::Occupied(_) => {
                panic!("Value already exists in table: {}", value);
            }
        }
    }

    println!("Inserted {} values into table", table.len());
    println!("Final load factor: {:.2}%", table.load_factor() * 100.0);

    table.probe_histogram().print();
    table.debug_stats().print();

    if args.remove_every > 0 {
        let mut removed = 0;
        for value in (0..num_values).step_by(args.remove_every as usize) {
            if table.remove(hash_u64(value), |&v| v == value).is_some() {
                removed += 1;
            }
        }
        println!("Removed {} values", removed);

        table.probe_histogram().print();
        table.debug_stats().print();
    }

    Ok(())
}
