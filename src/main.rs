use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use gis_simplifier::{
    run, Config, DEFAULT_INPUT, DEFAULT_MAX_SIZE_MB, DEFAULT_OUTPUT, DEFAULT_TOLERANCE, DEFAULT_TOP,
};

fn cli() -> Command {
    Command::new("GIS Simplifier")
        .version("1.0")
        .author("Jesper Fjellin")
        .about("Extracts the largest polygon from a GeoJSON file and simplifies it while preserving topology")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .num_args(1)
                .default_value(DEFAULT_INPUT)
                .help("Input GeoJSON file"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .num_args(1)
                .default_value(DEFAULT_OUTPUT)
                .help("Output GeoJSON file (overwritten)"),
        )
        .arg(
            Arg::new("tolerance")
                .short('t')
                .long("tolerance")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help(format!(
                    "Simplification tolerance in input coordinate units [default: {}]",
                    DEFAULT_TOLERANCE
                )),
        )
        .arg(
            Arg::new("explode")
                .long("explode")
                .action(ArgAction::SetTrue)
                .help("Split MultiPolygons into their polygons before picking the largest"),
        )
        .arg(
            Arg::new("name")
                .long("name")
                .num_args(1)
                .help("Value for the output feature's name property"),
        )
        .arg(
            Arg::new("top")
                .long("top")
                .num_args(1)
                .value_parser(value_parser!(usize))
                .help(format!("Number of largest geometries to list [default: {}]", DEFAULT_TOP)),
        )
        .arg(
            Arg::new("max-size-mb")
                .long("max-size-mb")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help(format!(
                    "Warn when the output file exceeds this size in MB [default: {}]",
                    DEFAULT_MAX_SIZE_MB
                )),
        )
}

// Unset numeric flags fall back to the library defaults.
fn config_from(matches: &ArgMatches) -> Result<Config, String> {
    let tolerance = matches
        .get_one::<f64>("tolerance")
        .copied()
        .unwrap_or(DEFAULT_TOLERANCE);
    if !(tolerance.is_finite() && tolerance > 0.0) {
        return Err("tolerance must be a positive number".to_string());
    }

    let max_size_mb = matches
        .get_one::<f64>("max-size-mb")
        .copied()
        .unwrap_or(DEFAULT_MAX_SIZE_MB);
    if !(max_size_mb.is_finite() && max_size_mb >= 0.0) {
        return Err("--max-size-mb must be a non-negative number".to_string());
    }

    Ok(Config {
        input: matches
            .get_one::<String>("input")
            .map_or_else(|| PathBuf::from(DEFAULT_INPUT), PathBuf::from),
        output: matches
            .get_one::<String>("output")
            .map_or_else(|| PathBuf::from(DEFAULT_OUTPUT), PathBuf::from),
        tolerance,
        explode: matches.get_flag("explode"),
        name: matches.get_one::<String>("name").cloned(),
        top: matches.get_one::<usize>("top").copied().unwrap_or(DEFAULT_TOP),
        max_size_mb,
    })
}

fn main() {
    let matches = cli().get_matches();

    let config = match config_from(&matches) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("Error: {}", message);
            std::process::exit(2);
        }
    };

    match run(&config) {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error processing file: {}", e);
            std::process::exit(1);
        }
    }
}
