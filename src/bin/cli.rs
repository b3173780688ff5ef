use anyhow::{anyhow, Result};
use colored::*;
use invoice_patcher::{
    core::types::{CarrierSelection, PatchStats, Strategy},
    utils::dirs,
    Engine, PatcherConfig,
};
use serde::Serialize;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "invoice-patcher",
    about = "Fix placeholder fields and missing invoice periods in health invoice XML"
)]
struct Opt {
    /// Invoice files, or directories of .xml files
    #[structopt(parse(from_os_str), required = true)]
    inputs: Vec<PathBuf>,

    /// Output path (single input file only)
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,

    /// Locating strategy: structural or literal
    #[structopt(long)]
    strategy: Option<Strategy>,

    /// Patch every carrier element instead of the configured occurrence
    #[structopt(long)]
    all_carriers: bool,

    /// Zero-based occurrence of the carrier element to patch
    #[structopt(long)]
    carrier_index: Option<usize>,

    /// Suffix appended to the file stem of derived output paths
    #[structopt(long)]
    suffix: Option<String>,

    /// Keep the XML declaration of re-embedded nested documents
    #[structopt(long)]
    keep_prolog: bool,

    /// Print per-file statistics as JSON
    #[structopt(long)]
    json: bool,
}

#[derive(Serialize)]
struct FileReport {
    input: PathBuf,
    output: Option<PathBuf>,
    stats: Option<PatchStats>,
    error: Option<String>,
}

fn build_config(opt: &Opt) -> Result<PatcherConfig> {
    let mut config = PatcherConfig::from_env()?;
    if let Some(strategy) = opt.strategy {
        config.strategy = strategy;
    }
    if opt.all_carriers {
        config.carriers = CarrierSelection::All;
    } else if let Some(index) = opt.carrier_index {
        config.carriers = CarrierSelection::Nth(index);
    }
    if let Some(suffix) = &opt.suffix {
        config.output_suffix = suffix.clone();
    }
    if opt.keep_prolog {
        config.strip_prolog = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opt = Opt::from_args();
    let config = build_config(&opt)?;
    let inputs = dirs::collect_inputs(&opt.inputs)?;

    if opt.output.is_some() && inputs.len() != 1 {
        return Err(anyhow!("--output requires exactly one input file, got {}", inputs.len()));
    }

    let engine = Engine::new(config);
    log::info!(
        "Patching {} file(s) with the {} strategy",
        inputs.len(),
        engine.config().strategy
    );

    let mut reports = Vec::with_capacity(inputs.len());
    for input in inputs {
        let report = match engine.process(&input, opt.output.as_deref()) {
            Ok((output, stats)) => {
                if !opt.json {
                    println!(
                        "{} {} -> {} (nested: {}, fields: {}, period added: {})",
                        "patched".green().bold(),
                        input.display(),
                        output.display(),
                        stats.nested_documents,
                        stats.fired.len(),
                        stats.period_added
                    );
                }
                FileReport {
                    input,
                    output: Some(output),
                    stats: Some(stats),
                    error: None,
                }
            }
            Err(e) => {
                log::error!("Failed to patch {:?}: {}", input, e);
                if !opt.json {
                    eprintln!("{} {}: {}", "failed".red().bold(), input.display(), e);
                }
                FileReport {
                    input,
                    output: None,
                    stats: None,
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    if opt.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    let failed = reports.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        return Err(anyhow!("{} of {} file(s) failed", failed, reports.len()));
    }
    Ok(())
}
