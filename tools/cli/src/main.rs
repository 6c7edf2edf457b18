//! memprim: validate and benchmark memory move/fill candidates
//!
//! ```bash
//! memprim --validate --memcpy --memset
//! memprim --validate --memcpy --overlap --candidate reference --candidate simd
//! memprim --bench --memset --config run.json
//! ```
//!
//! Exit status: 0 when every validation passed, 2 when a candidate diverged
//! from the reference, 1 on usage, configuration or allocation errors.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use log::{error, info, warn};
use memprim::{
    BenchContext, BenchSample, Bencher, FILLER_NAMES, Filler, MOVER_NAMES, Mover, RunConfig,
    ValidationContext, ValidationReport, Validator, lookup_filler, lookup_mover,
};
use memprim_error::{MemError, log_error};
use serde::Serialize;

const EXIT_OK: i32 = 0;
const EXIT_FAILURE: i32 = 1;
const EXIT_DIVERGED: i32 = 2;

const DEFAULT_CANDIDATES: [&str; 2] = ["simd", "std"];

fn build_cli() -> Command {
    Command::new("memprim")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate and benchmark memory move/fill implementations against a word-wise reference")
        .arg(
            Arg::new("validate")
                .long("validate")
                .help("Run the exhaustive alignment x length validation")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("bench")
                .long("bench")
                .help("Run the throughput benchmark")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("memcpy")
                .long("memcpy")
                .visible_alias("move")
                .help("Operate on move/copy candidates")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("memset")
                .long("memset")
                .visible_alias("fill")
                .help("Operate on fill candidates")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("overlap")
                .long("overlap")
                .help("Also validate in-place overlapping moves")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("candidate")
                .short('c')
                .long("candidate")
                .value_name("NAME")
                .help("Candidate to check (repeatable): reference, bytewise, std, simd, null")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("JSON configuration file")
                .required(false),
        )
        .arg(
            Arg::new("halt-on-ceiling")
                .long("halt-on-ceiling")
                .help("Stop a sweep once the error ceiling is reached")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print reports and samples as JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log sweep progress")
                .action(ArgAction::SetTrue),
        )
}

#[derive(Debug)]
struct Options {
    validate: bool,
    bench: bool,
    moves: bool,
    fills: bool,
    overlap: bool,
    candidates: Vec<String>,
    config: Option<PathBuf>,
    halt_on_ceiling: bool,
    json: bool,
}

impl Options {
    fn from_matches(matches: &ArgMatches) -> Self {
        let candidates = match matches.get_many::<String>("candidate") {
            Some(names) => names.cloned().collect(),
            None => DEFAULT_CANDIDATES.iter().map(ToString::to_string).collect(),
        };

        Self {
            validate: matches.get_flag("validate"),
            bench: matches.get_flag("bench"),
            moves: matches.get_flag("memcpy"),
            fills: matches.get_flag("memset"),
            overlap: matches.get_flag("overlap"),
            candidates,
            config: matches.get_one::<String>("config").map(PathBuf::from),
            halt_on_ceiling: matches.get_flag("halt-on-ceiling"),
            json: matches.get_flag("json"),
        }
    }

    /// At least one mode and one operation must be selected.
    fn is_runnable(&self) -> bool {
        (self.validate || self.bench) && (self.moves || self.fills)
    }
}

#[derive(Debug, Default, Serialize)]
struct RunOutput {
    validation: Vec<ValidationReport>,
    bench: Vec<BenchSample>,
}

impl RunOutput {
    fn diverged(&self) -> bool {
        self.validation.iter().any(|r| !r.passed())
    }

    fn exit_code(&self) -> i32 {
        if self.diverged() { EXIT_DIVERGED } else { EXIT_OK }
    }
}

/// Component reported for a failed run: allocation failures abort the run,
/// everything else comes from the configuration or the command line.
fn failure_component(error: &MemError) -> &'static str {
    if error.is_fatal() { "allocation" } else { "configuration" }
}

type Candidates = (Vec<Box<dyn Mover>>, Vec<Box<dyn Filler>>);

/// Split the requested names into movers and fillers.
///
/// A name known to only one of the two operations is skipped for the other.
fn resolve_candidates(names: &[String]) -> anyhow::Result<Candidates> {
    let mut movers = Vec::new();
    let mut fillers = Vec::new();

    for name in names {
        let is_mover = MOVER_NAMES.contains(&name.as_str());
        let is_filler = FILLER_NAMES.contains(&name.as_str());
        if !is_mover && !is_filler {
            return Err(MemError::UnknownCandidate(name.clone()).into());
        }
        if is_mover {
            movers.push(lookup_mover(name)?);
        }
        if is_filler {
            fillers.push(lookup_filler(name)?);
        }
    }

    Ok((movers, fillers))
}

fn run_validation(
    options: &Options,
    config: &RunConfig,
    movers: &[&dyn Mover],
    fillers: &[&dyn Filler],
    output: &mut RunOutput,
) -> anyhow::Result<()> {
    let mut ctx = ValidationContext::for_config(&config.validation)
        .context("failed to allocate validation regions")?;
    let mut validator = Validator::new(config.validation.clone(), &mut ctx)?;

    let mut reports = Vec::new();
    if options.moves {
        reports.extend(validator.validate_all_moves(movers));
        if options.overlap {
            for mover in movers {
                if !mover.handles_overlap() {
                    warn!("skipping overlap sweep for [{}]: memcpy semantics only", mover.name());
                    continue;
                }
                reports.push(validator.validate_overlapping_move(*mover));
            }
        }
    }
    if options.fills {
        reports.extend(validator.validate_all_fills(fillers));
    }

    if !options.json {
        for report in &reports {
            println!("{}", report);
            for outcome in report.outcomes.iter() {
                println!("  {}", outcome);
            }
        }
    }
    output.validation.extend(reports);
    Ok(())
}

fn run_bench(
    options: &Options,
    config: &RunConfig,
    movers: &[&dyn Mover],
    fillers: &[&dyn Filler],
    output: &mut RunOutput,
) -> anyhow::Result<()> {
    let mut ctx = BenchContext::new(&config.bench).context("failed to allocate benchmark regions")?;
    let mut bencher = Bencher::new(config.bench.clone(), &mut ctx)?;
    let print = |sample: &BenchSample| {
        if !options.json {
            println!("{} size {}: {}", sample.operation, sample.size, sample);
        }
    };

    if options.moves {
        output.bench.extend(bencher.bench_move_with(movers, print)?);
    }
    if options.fills {
        output.bench.extend(bencher.bench_fill_with(fillers, print)?);
    }
    Ok(())
}

fn run(options: &Options) -> anyhow::Result<RunOutput> {
    let mut config = match &options.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => RunConfig::default(),
    };
    if options.halt_on_ceiling {
        config.validation.halt_on_ceiling = true;
    }

    let (movers, fillers) = resolve_candidates(&options.candidates)?;
    let movers: Vec<&dyn Mover> = movers.iter().map(Box::as_ref).collect();
    let fillers: Vec<&dyn Filler> = fillers.iter().map(Box::as_ref).collect();

    if options.moves && movers.is_empty() {
        warn!("no move candidate among {:?}", options.candidates);
    }
    if options.fills && fillers.is_empty() {
        warn!("no fill candidate among {:?}", options.candidates);
    }

    info!("simd candidate: {}", memprim::simd_feature_name());

    let mut output = RunOutput::default();
    if options.validate {
        run_validation(options, &config, &movers, &fillers, &mut output)?;
    }
    if options.bench {
        run_bench(options, &config, &movers, &fillers, &mut output)?;
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(output)
}

fn main() {
    let matches = build_cli().get_matches();
    let default_filter = if matches.get_flag("verbose") { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", default_filter))
        .init();

    let options = Options::from_matches(&matches);
    if !options.is_runnable() {
        eprintln!("at least one of --validate/--bench and one of --memcpy/--memset is required\n");
        if let Err(e) = build_cli().print_help() {
            error!("Failed to print usage: {}", e);
        }
        process::exit(EXIT_FAILURE);
    }

    match run(&options) {
        Ok(output) => {
            if output.diverged() {
                error!("one or more candidates diverged from the reference");
            }
            process::exit(output.exit_code());
        }
        Err(e) => {
            match e.root_cause().downcast_ref::<MemError>() {
                Some(mem_error) => {
                    log_error(mem_error, failure_component(mem_error));
                    if e.chain().count() > 1 {
                        error!("{}", e);
                    }
                }
                None => error!("{:#}", e),
            }
            process::exit(EXIT_FAILURE);
        }
    }
}
