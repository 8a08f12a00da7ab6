//! xana — driver for the event-processing framework.
//!
//! Builds the framework from the configuration file and command-line
//! overrides, wires a data source for the given inputs, and drains the event
//! iterator; all real work happens inside the configured modules.
//!
//! Exit codes: `0` on success, `2` when no modules or no input are
//! configured, `1` on abort or any construction failure.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use xana_runtime::{Error, Framework, FRAMEWORK_SECTION};

/// Default configuration file, used when present and no modules are given
/// on the command line.
const DEFAULT_CONFIG: &str = "xana.toml";

/// Config key that dumps the configuration file before running.
const DUMP_CONFIG_KEY: &str = "dump-config-file";

#[derive(Parser, Debug)]
#[command(name = "xana")]
#[command(version, about = "Process detector data through a chain of analysis modules")]
struct Args {
    /// Configuration file; defaults to xana.toml if it exists and no -m is given
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Module spec Package.Class[:instance]; repeatable, overrides the config
    #[arg(short, long = "module", value_name = "NAME")]
    modules: Vec<String>,

    /// Experiment name, format INSTR:exp or exp (instrument guessed from it)
    #[arg(short, long, value_name = "EXP")]
    experiment: Option<String>,

    /// Job name; default is derived from the first input file name
    #[arg(short, long, value_name = "NAME")]
    job_name: Option<String>,

    /// Calibration directory; may include {instr} and {exp} placeholders
    #[arg(short = 'b', long, value_name = "PATH")]
    calib_dir: Option<String>,

    /// Maximum number of events to process, 0 means all
    #[arg(short = 'n', long, value_name = "NUM", default_value_t = 0)]
    num_events: u64,

    /// Number of events to skip
    #[arg(short = 's', long, value_name = "NUM", default_value_t = 0)]
    skip_events: u64,

    /// Number greater than 0 enables multi-processing
    #[arg(short = 'p', long, value_name = "NUM", default_value_t = 0)]
    num_cpu: u32,

    /// Configuration override, format sect.key[=value]; repeatable
    #[arg(short = 'o', long = "option", value_name = "OPT")]
    options: Vec<String>,

    /// Verbose logging (info level)
    #[arg(short, long)]
    verbose: bool,

    /// Input files or dataset specifications
    #[arg(value_name = "DATASET")]
    datasets: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let mut options = collect_options(&args);

    let config_file = args.config.clone().or_else(|| {
        (args.modules.is_empty() && Path::new(DEFAULT_CONFIG).exists())
            .then(|| PathBuf::from(DEFAULT_CONFIG))
    });

    if let Some(pos) = options.iter().position(|(key, _)| {
        key == DUMP_CONFIG_KEY || key == &format!("{FRAMEWORK_SECTION}.{DUMP_CONFIG_KEY}")
    }) {
        options.remove(pos);
        dump_config_file(config_file.as_deref());
    }

    let fwk = Framework::new(config_file.as_deref(), &options)?;
    if !fwk.has_modules() {
        error!("no analysis modules specified");
        return Ok(ExitCode::from(2));
    }
    let max_events = fwk
        .store()
        .get_or::<u64>(FRAMEWORK_SECTION, "events", 0)?;

    let ds = match fwk.data_source(&args.datasets) {
        Ok(ds) => ds,
        Err(Error::NoInput) => {
            error!("no input data specified");
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    let mut events = ds.events();
    let mut count: u64 = 0;
    while events.next()?.is_some() {
        count += 1;
        if max_events > 0 && count >= max_events {
            info!(events = count, "reached configured event limit");
            break;
        }
    }

    info!(events = count, "processing finished");
    Ok(ExitCode::SUCCESS)
}

// Maps command-line flags onto configuration overrides; explicit -o options
// come last so they win.
fn collect_options(args: &Args) -> Vec<(String, String)> {
    let mut options = Vec::new();
    let framework_key = |key: &str| format!("{FRAMEWORK_SECTION}.{key}");

    if !args.modules.is_empty() {
        options.push((framework_key("modules"), args.modules.join(" ")));
    }

    if let Some(experiment) = &args.experiment {
        let (instrument, experiment) = match experiment.split_once(':') {
            Some((instrument, experiment)) => (instrument.to_owned(), experiment.to_owned()),
            None => {
                let head: String = experiment.chars().take(3).collect();
                (head.to_uppercase(), experiment.clone())
            }
        };
        options.push((framework_key("instrument"), instrument));
        options.push((framework_key("experiment"), experiment));
    }

    if let Some(job_name) = &args.job_name {
        options.push((framework_key("job-name"), job_name.clone()));
    }
    if let Some(calib_dir) = &args.calib_dir {
        options.push((framework_key("calib-dir"), calib_dir.clone()));
    }
    if args.num_events > 0 {
        options.push((framework_key("events"), args.num_events.to_string()));
    }
    if args.skip_events > 0 {
        options.push((framework_key("skip-events"), args.skip_events.to_string()));
    }
    if args.num_cpu > 0 {
        options.push((framework_key("parallel"), args.num_cpu.to_string()));
    }

    for option in &args.options {
        match option.split_once('=') {
            Some((key, value)) => options.push((key.to_owned(), value.to_owned())),
            None => options.push((option.clone(), String::new())),
        }
    }

    options
}

fn dump_config_file(path: Option<&Path>) {
    let Some(path) = path else {
        return;
    };
    println!("--------- xana config file: {} ------------", path.display());
    match std::fs::read_to_string(path) {
        Ok(text) => print!("{text}"),
        Err(_) => println!(" ** unable to open file **"),
    }
    println!("------- end xana config file ---------");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("xana").chain(argv.iter().copied())).unwrap()
    }

    fn options_map(args: &Args) -> Vec<(String, String)> {
        collect_options(args)
    }

    #[test]
    fn modules_flag_overrides_config_key() {
        let args = parse(&["-m", "Dump.Printer", "-m", "xana.EventKeys", "a.xtc"]);
        let options = options_map(&args);
        assert!(options.contains(&(
            "xana.modules".to_owned(),
            "Dump.Printer xana.EventKeys".to_owned()
        )));
        assert_eq!(args.datasets, vec!["a.xtc"]);
    }

    #[test]
    fn experiment_without_instrument_guesses_prefix() {
        let args = parse(&["-e", "xpp12311"]);
        let options = options_map(&args);
        assert!(options.contains(&("xana.instrument".to_owned(), "XPP".to_owned())));
        assert!(options.contains(&("xana.experiment".to_owned(), "xpp12311".to_owned())));
    }

    #[test]
    fn experiment_with_instrument_is_split() {
        let args = parse(&["-e", "CXI:cxi78914"]);
        let options = options_map(&args);
        assert!(options.contains(&("xana.instrument".to_owned(), "CXI".to_owned())));
        assert!(options.contains(&("xana.experiment".to_owned(), "cxi78914".to_owned())));
    }

    #[test]
    fn numeric_flags_become_options_only_when_set() {
        let args = parse(&["-n", "100", "-p", "4"]);
        let options = options_map(&args);
        assert!(options.contains(&("xana.events".to_owned(), "100".to_owned())));
        assert!(options.contains(&("xana.parallel".to_owned(), "4".to_owned())));
        assert!(!options.iter().any(|(k, _)| k == "xana.skip-events"));
    }

    #[test]
    fn explicit_options_parse_key_and_value() {
        let args = parse(&["-o", "Dump.Printer.lines=3", "-o", "xana.quiet"]);
        let options = options_map(&args);
        assert!(options.contains(&("Dump.Printer.lines".to_owned(), "3".to_owned())));
        assert!(options.contains(&("xana.quiet".to_owned(), String::new())));
    }
}
