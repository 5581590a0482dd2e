//! asterix: command-line decoder and encoder for ASTERIX CAT062 records.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use asterix_core::config::{self, Config};
use asterix_core::{
    decode_record_exact, decode_records, encode_record, hex_decode, hex_encode, AsterixError,
    Record, Uap,
};

mod input;

#[derive(Parser)]
#[command(name = "asterix", version, about = "ASTERIX CAT062 record codec")]
struct Cli {
    /// Config file (default: ~/.asterix-codec/config.yaml)
    #[arg(long, global = true, env = "ASTERIX_CONFIG")]
    config: Option<PathBuf>,

    /// Log verbosity on stderr (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode hex records (one record body per line) and print their items
    Decode {
        /// Path to file containing hex records, or - for stdin
        file: PathBuf,

        /// Print one JSON record per line instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Encode JSON records (as printed by `decode --json`) to hex
    Encode {
        /// Path to file containing JSON records, or - for stdin
        file: PathBuf,
    },

    /// Decode and re-encode hex records, reporting any that differ
    Roundtrip {
        /// Path to file containing hex records, or - for stdin
        file: PathBuf,
    },

    /// Print the CAT062 UAP
    Uap,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref());
    let uap = Uap::cat062(&config.codec);

    match cli.command {
        Commands::Decode { file, json } => cmd_decode(&uap, &config, &file, json),
        Commands::Encode { file } => cmd_encode(&uap, &file),
        Commands::Roundtrip { file } => cmd_roundtrip(&config, &file),
        Commands::Uap => cmd_uap(&uap),
        Commands::InitConfig { force } => cmd_init_config(cli.config.as_deref(), force),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Config {
    match path {
        Some(p) => config::load_config_from(p).unwrap_or_else(|e| {
            eprintln!("Error loading config {}: {e}", p.display());
            std::process::exit(1);
        }),
        None => config::load_config(),
    }
}

fn open_input(file: &Path) -> Box<dyn std::io::BufRead> {
    input::open(file).unwrap_or_else(|e| {
        eprintln!("Error opening {}: {e}", file.display());
        std::process::exit(1);
    })
}

/// Decode one input line: exactly one record when the length check is on,
/// otherwise every record packed into the line.
fn decode_line(uap: &Uap, config: &Config, hex: &str) -> Result<Vec<Record>, AsterixError> {
    let bytes = hex_decode(hex).ok_or_else(|| AsterixError::InvalidHex(hex.to_string()))?;
    if config.decode.strict_length {
        Ok(vec![decode_record_exact(uap, &bytes)?])
    } else {
        decode_records(uap, &bytes)
    }
}

/// Decode one input line and encode its records again, back to back.
fn reencode_line(uap: &Uap, config: &Config, hex: &str) -> Result<Vec<u8>, AsterixError> {
    let mut out = Vec::new();
    for record in decode_line(uap, config, hex)? {
        out.extend(encode_record(uap, &record)?);
    }
    Ok(out)
}

fn cmd_decode(uap: &Uap, config: &Config, file: &Path, json: bool) {
    let mut total = 0u64;
    let mut failed = 0u64;

    for (lineno, hex) in input::records(open_input(file)) {
        total += 1;
        let records = match decode_line(uap, config, &hex) {
            Ok(r) => r,
            Err(e) => {
                failed += 1;
                warn!(line = lineno, error = %e, "decode failed");
                if !json {
                    println!("line {lineno}: error: {e}");
                }
                continue;
            }
        };

        for record in &records {
            if json {
                match serde_json::to_string(record) {
                    Ok(s) => println!("{s}"),
                    Err(e) => eprintln!("line {lineno}: {e}"),
                }
            } else {
                println!("line {lineno}:");
                println!("{}", record_table(uap, record));
            }
        }
    }

    if !json {
        println!();
        println!("Lines: {total} read, {} decoded, {failed} failed", total - failed);
    }
}

fn record_table(uap: &Uap, record: &Record) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["FRN", "Item", "Name", "Value"]);
    for (frn, value) in record.iter() {
        let (id, name) = uap
            .slot(frn)
            .map(|s| (s.codec.id(), s.codec.name()))
            .unwrap_or(("?", "?"));
        table.add_row(vec![
            Cell::new(frn),
            Cell::new(id),
            Cell::new(name),
            Cell::new(uap.describe(frn, value)),
        ]);
    }
    table
}

fn cmd_encode(uap: &Uap, file: &Path) {
    let mut failed = 0u64;

    for (lineno, line) in input::records(open_input(file)) {
        let record: Record = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                failed += 1;
                eprintln!("line {lineno}: invalid JSON record: {e}");
                continue;
            }
        };
        match encode_record(uap, &record) {
            Ok(bytes) => println!("{}", hex_encode(&bytes)),
            Err(e) => {
                failed += 1;
                eprintln!("line {lineno}: {e}");
            }
        }
    }

    if failed > 0 {
        std::process::exit(1);
    }
}

fn cmd_roundtrip(config: &Config, file: &Path) {
    // Compare value re-encoding against the input, never replayed bytes
    let mut codec = config.codec;
    codec.raw_replay = false;
    let uap = Uap::cat062(&codec);

    let mut total = 0u64;
    let mut identical = 0u64;
    let mut failed = 0u64;

    for (lineno, hex) in input::records(open_input(file)) {
        total += 1;
        let Some(bytes) = hex_decode(&hex) else {
            failed += 1;
            println!("line {lineno}: invalid hex");
            continue;
        };
        match reencode_line(&uap, config, &hex) {
            Ok(out) if out == bytes => {
                identical += 1;
                debug!(line = lineno, "identical");
            }
            Ok(out) => {
                println!("line {lineno}: differs");
                println!("  in:  {}", hex_encode(&bytes));
                println!("  out: {}", hex_encode(&out));
                if let Some(at) = bytes.iter().zip(&out).position(|(a, b)| a != b) {
                    println!("  first difference at byte {at}");
                }
            }
            Err(e) => {
                failed += 1;
                println!("line {lineno}: error: {e}");
            }
        }
    }

    println!();
    println!(
        "Records: {total} read, {identical} identical, {} differ, {failed} failed",
        total - identical - failed
    );

    if identical != total {
        std::process::exit(1);
    }
}

fn cmd_uap(uap: &Uap) {
    println!();
    println!("CAT{:03} edition {}", uap.category, uap.edition);
    println!();

    let mut table = Table::new();
    table.set_header(vec!["FRN", "Item", "Name", "Length"]);
    for frn in 1..=uap.max_frn() as u8 {
        match uap.slot(frn) {
            Some(slot) => table.add_row(vec![
                Cell::new(frn),
                Cell::new(slot.codec.id()),
                Cell::new(slot.codec.name()),
                Cell::new(slot.length),
            ]),
            None => table.add_row(vec![
                Cell::new(frn),
                Cell::new("-"),
                Cell::new("spare"),
                Cell::new("-"),
            ]),
        };
    }
    println!("{table}");
}

fn cmd_init_config(path: Option<&Path>, force: bool) {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config::config_file);
    if path.exists() && !force {
        eprintln!("{} already exists (use --force to overwrite)", path.display());
        std::process::exit(1);
    }
    if let Err(e) = config::save_config_to(&Config::default(), &path) {
        eprintln!("Error writing {}: {e}", path.display());
        std::process::exit(1);
    }
    println!("Wrote {}", path.display());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use asterix_core::config::DecodeConfig;

    fn config(strict_length: bool) -> Config {
        Config {
            decode: DecodeConfig { strict_length },
            ..Config::default()
        }
    }

    // Two FRN 1 records back to back
    const TWO_RECORDS: &str = "801964 800102";

    #[test]
    fn test_decode_line_strict_length() {
        let uap = Uap::cat062(&config(true).codec);
        let records = decode_line(&uap, &config(true), "801964").unwrap();
        assert_eq!(records.len(), 1);

        let err = decode_line(&uap, &config(true), TWO_RECORDS).unwrap_err();
        assert!(matches!(
            err,
            AsterixError::TrailingBytes {
                consumed: 3,
                len: 6
            }
        ));
    }

    #[test]
    fn test_decode_line_packed_records() {
        let uap = Uap::cat062(&config(false).codec);
        let records = decode_line(&uap, &config(false), TWO_RECORDS).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            encode_record(&uap, &records[1]).unwrap(),
            vec![0x80, 0x01, 0x02]
        );
    }

    #[test]
    fn test_reencode_line() {
        let uap = Uap::cat062(&config(false).codec);
        // Non-minimal FSPEC on the first record comes back minimal
        let out = reencode_line(&uap, &config(false), "81001964 800102").unwrap();
        assert_eq!(out, vec![0x80, 0x19, 0x64, 0x80, 0x01, 0x02]);
        assert!(reencode_line(&uap, &config(true), TWO_RECORDS).is_err());
    }

    #[test]
    fn test_decode_line_invalid_hex() {
        let uap = Uap::cat062(&config(true).codec);
        assert!(matches!(
            decode_line(&uap, &config(true), "80ZZ"),
            Err(AsterixError::InvalidHex(_))
        ));
    }
}
