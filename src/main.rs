use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{arg, value_parser, Command};
use tracing::info;

use pelletloc::{config::Config, input, output, pipeline, telemetry};

fn cli() -> Command {
    Command::new("pelletloc")
        .about("Sites depots and refineries and allocates biomass and pellet flows")
        .arg(
            arg!(--demand <PATH> "Demand table CSV (Latitude, Longitude, one column per year)")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--distance [PATH] "Pairwise distance matrix CSV; haversine distances when omitted")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(--years <YEARS> "Comma-separated target years, e.g. 2018,2019")
                .value_delimiter(',')
                .value_parser(value_parser!(u32)),
        )
        .arg(arg!(--config [PATH] "TOML configuration file").value_parser(value_parser!(PathBuf)))
        .arg(arg!(--out <PATH> "Output record CSV").value_parser(value_parser!(PathBuf)))
        .arg(arg!(-v --verbose "Debug logging"))
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    telemetry::init_tracing(matches.get_flag("verbose"));

    let config = Config::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))
        .context("loading configuration")?;

    let demand_path = matches.get_one::<PathBuf>("demand").expect("required by clap");
    let table = input::load_demand_csv(demand_path)
        .with_context(|| format!("reading demand table {}", demand_path.display()))?;

    let distances = match matches.get_one::<PathBuf>("distance") {
        Some(path) => input::load_distance_csv(path)
            .with_context(|| format!("reading distance matrix {}", path.display()))?,
        None => pipeline::site_distances(&table),
    };

    let years: Vec<u32> = matches
        .get_many::<u32>("years")
        .map(|ys| ys.copied().collect())
        .unwrap_or_default();

    let result = pipeline::run(&table, &distances, &years, &config)?;

    let out = matches.get_one::<PathBuf>("out").expect("required by clap");
    output::write_csv(out, &result.records).with_context(|| format!("writing {}", out.display()))?;
    info!(path = %out.display(), records = result.records.len(), "records written");
    Ok(())
}
