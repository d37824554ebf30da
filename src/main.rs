use std::env;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sfvotes::cache::DirCache;
use sfvotes::session::Fetcher;
use sfvotes::vote::{VoteRecord, VoteSink};
use sfvotes::walker::Walker;
use sfvotes::Result;

struct Args {
    first_year: u16,
    last_year: u16,
    cache_dir: String,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            eprintln!("Usage: sfvotes <first-year> [last-year] [--cache-dir DIR]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let walker = Walker::new();
    for year in args.first_year..=args.last_year {
        // Each walk owns its own session; only the cache directory is
        // shared between them.
        let mut fetcher = Fetcher::new(DirCache::new(&args.cache_dir))?;
        let mut sink = TsvSink::default();
        walker.walk_year(&mut fetcher, year, &mut sink)?;
        info!(year, records = sink.count, "year complete");
    }
    Ok(())
}

fn parse_args() -> std::result::Result<Args, String> {
    let mut first_year = None;
    let mut last_year = None;
    let mut cache_dir = String::from("./cache");

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--cache-dir" => {
                cache_dir = args.next().ok_or("Missing value for --cache-dir")?;
            }
            year => {
                let year: u16 = year
                    .parse()
                    .map_err(|_| format!("Not a year: {year}"))?;
                if first_year.is_none() {
                    first_year = Some(year);
                } else if last_year.is_none() {
                    last_year = Some(year);
                } else {
                    return Err(format!("Unexpected argument: {year}"));
                }
            }
        }
    }

    let first_year = first_year.ok_or("Missing first year")?;
    let last_year = last_year.unwrap_or(first_year);
    if last_year < first_year {
        return Err(format!("Year range is backwards: {first_year}..{last_year}"));
    }
    Ok(Args {
        first_year,
        last_year,
        cache_dir,
    })
}

/// Writes each record as a tab-separated line on stdout. Real persistence
/// lives behind `VoteSink` in external collaborators.
#[derive(Default)]
struct TsvSink {
    count: usize,
}

impl VoteSink for TsvSink {
    fn record(&mut self, record: VoteRecord) -> Result<()> {
        let votes: Vec<String> = record
            .votes
            .iter()
            .map(|(name, cast)| format!("{name}={cast:?}"))
            .collect();
        println!(
            "{}\t{}\t{}\t{}",
            record.file_number,
            record.action_date,
            record.title,
            votes.join(",")
        );
        self.count += 1;
        Ok(())
    }
}
