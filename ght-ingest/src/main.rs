//! Builds a `.ght` tree from a CSV of already-reprojected WGS84 points, in
//! the spirit of the documented `las2ght` surface without LAS parsing or
//! coordinate reprojection.
//!
//! ```text
//! ght-ingest --csv FILE --out FILE [--allow-duplicates] [--max-hash-length N]
//! ```
//!
//! The CSV's first two columns are longitude and latitude; every remaining
//! column becomes an `f64` dimension named after its header.

use ght::{Config, Dimension, Node, ScalarType, Schema, Tree, Writer};
use std::process::ExitCode;
use std::sync::Arc;

const EXENAME: &str = "ght-ingest";
const DEFAULT_MAX_HASH_LENGTH: u8 = 18;

struct Args {
    csv: String,
    out: String,
    allow_duplicates: bool,
    max_hash_length: u8,
}

fn usage() {
    eprintln!("{}", EXENAME);
    eprintln!();
    eprintln!("Usage: {} --csv FILE --out FILE [options]", EXENAME);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --csv FILE               Read points from this CSV file.");
    eprintln!("  --out FILE               Write the tree to this .ght file.");
    eprintln!("  --allow-duplicates       Keep repeated coordinates as duplicate children.");
    eprintln!("  --max-hash-length N      Geohash characters of precision (0..=18, default {}).", DEFAULT_MAX_HASH_LENGTH);
}

fn parse_args() -> Option<Args> {
    let mut csv = None;
    let mut out = None;
    let mut allow_duplicates = false;
    let mut max_hash_length = DEFAULT_MAX_HASH_LENGTH;

    let mut raw = std::env::args().skip(1);
    while let Some(flag) = raw.next() {
        match flag.as_str() {
            "--csv" => csv = Some(raw.next()?),
            "--out" => out = Some(raw.next()?),
            "--allow-duplicates" => allow_duplicates = true,
            "--max-hash-length" => {
                max_hash_length = raw.next()?.parse().ok()?;
            }
            _ => return None,
        }
    }

    Some(Args {
        csv: csv?,
        out: out?,
        allow_duplicates,
        max_hash_length,
    })
}

/// Builds a schema from a CSV header: `lon`, `lat`, then one `f64` dimension
/// per remaining column.
fn schema_from_header(header: &csv::StringRecord) -> ght::GhtResult<Arc<Schema>> {
    let mut schema = Schema::new();
    for name in header.iter().skip(2) {
        schema.push(Dimension::new(name, "", ScalarType::F64))?;
    }
    Ok(Arc::new(schema))
}

fn run(args: Args) -> ght::GhtResult<()> {
    log::info!("{} reading {}", EXENAME, args.csv);

    let mut reader = csv::Reader::from_path(&args.csv).map_err(csv_err)?;
    let header = reader.headers().map_err(csv_err)?.clone();
    let schema = schema_from_header(&header)?;

    let mut config = Config::new(args.max_hash_length)?;
    config.allow_duplicates = args.allow_duplicates;

    let mut tree = Tree::new(schema.clone(), config);
    let mut count = 0u32;

    for result in reader.records() {
        let record = result.map_err(csv_err)?;
        let lon: f64 = parse_field(&record, 0)?;
        let lat: f64 = parse_field(&record, 1)?;

        let hash = ght_geohash::encode(
            ght_geohash::Coordinate { x: lon, y: lat },
            args.max_hash_length as usize,
        )?;
        let mut node = Node::new_leaf(hash);
        for (dim, field) in schema.dimensions().iter().zip(record.iter().skip(2)) {
            let value: f64 = field.parse().map_err(|_| csv_parse_error(&record))?;
            node.attributes_mut()
                .append(ght::Attribute::new_from_real(dim.clone(), value));
        }

        tree.insert_node(node)?;
        count += 1;
        if count % 100_000 == 0 {
            log::info!("{} points ingested", count);
        }
    }

    tree.compact_attributes();
    log::info!(
        "{} points, root hash {:?}",
        tree.get_numpoints(),
        tree.get_hash()
    );

    let mut writer = Writer::create_file(&args.out)?;
    tree.write(&mut writer)?;
    log::info!("wrote {}", args.out);
    Ok(())
}

fn parse_field(record: &csv::StringRecord, index: usize) -> ght::GhtResult<f64> {
    record
        .get(index)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| csv_parse_error(record))
}

fn csv_parse_error(record: &csv::StringRecord) -> ght::GhtError {
    let io_err = std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        format!("could not parse numeric field in record {:?}", record),
    );
    ght::GhtError::Io(io_err)
}

fn csv_err(err: csv::Error) -> ght::GhtError {
    ght::GhtError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, err))
}

fn main() -> ExitCode {
    pretty_env_logger::init();

    let args = match parse_args() {
        Some(args) => args,
        None => {
            usage();
            return ExitCode::FAILURE;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
