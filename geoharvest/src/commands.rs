use crate::CLAP_STYLING;
use clap::arg;
use geoharvest_core::model::{DEFAULT_CATEGORY, DEFAULT_DOMAIN};

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("geoharvest")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("geoharvest")
        .about(
            "Search several classifieds sites at once and write the geotagged results to a \
            point dataset.",
        )
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and progress output").required(false))
        .arg(
            arg!(-o --"output" <PATH>)
                .required(true)
                .help("Where to write the dataset (newline-delimited GeoJSON)"),
        )
        .arg(
            arg!(-c --"sites" <SITES>)
                .required_unless_present("sites-file")
                .help("Comma separated list of sites to search, e.g. minneapolis,duluth")
                .conflicts_with("sites-file"),
        )
        .arg(
            arg!(-S --"sites-file" <PATH>)
                .required(false)
                .help("Path to a newline-delimited file of sites to search")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .conflicts_with("sites"),
        )
        .arg(
            arg!(-t --"category" <CODE>)
                .required(false)
                .help("Three-letter section code: sss (for sale), zip (free), cta (cars+trucks)")
                .default_value(DEFAULT_CATEGORY),
        )
        .arg(
            arg!(-s --"search" <TEXT>)
                .required(false)
                .help("Search terms (default: everything in the section)"),
        )
        .arg(
            arg!(--"domain" <DOMAIN>)
                .required(false)
                .help("Parent domain the site names are prefixed to")
                .default_value(DEFAULT_DOMAIN),
        )
        .arg(
            arg!(-j --"concurrency" <NUM_FETCHES>)
                .required(false)
                .help("Maximum number of searches in flight at once")
                .value_parser(clap::value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            arg!(--"timeout" <SECONDS>)
                .required(false)
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .default_value("30"),
        )
}
