//! smfix - G-code post-processor for Snapmaker printers
//!
//! Usage:
//!   smfix <input.gcode>                  rewrite the file in place
//!   smfix <input.gcode> -o <out.gcode>   write somewhere else
//!   smfix <input.gcode> --dump-params    print the header parameters as JSON

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use smfix::{dump_params, init_logging, process_file, Config, BUILD_DATE, VERSION};

/// Post-process slicer G-code for Snapmaker dual-extruder firmware
#[derive(Parser, Debug)]
#[command(name = "smfix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// G-code file to process
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output file, defaults to rewriting the input
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Keep slicer tool numbers as they are
    #[arg(long)]
    no_remap: bool,

    /// Do not shut off nozzles that are no longer in use
    #[arg(long)]
    no_shutoff: bool,

    /// Do not move nozzle reheats earlier
    #[arg(long)]
    no_preheat: bool,

    /// Do not reinforce prime tower wipes
    #[arg(long)]
    no_reinforce: bool,

    /// Keep M104 commands without a target tool inside tool changes
    #[arg(long)]
    no_unload_fix: bool,

    /// Parallel scan lanes (0 = one per CPU)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Print the extracted header parameters as JSON and exit
    #[arg(long)]
    dump_params: bool,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command line switches win over the configuration file
    fn apply(&self, config: &mut Config) {
        let pipeline = &mut config.pipeline;
        pipeline.remap_tools &= !self.no_remap;
        pipeline.shutoff &= !self.no_shutoff;
        pipeline.preheat &= !self.no_preheat;
        pipeline.reinforce_tower &= !self.no_reinforce;
        pipeline.fix_tool_unload &= !self.no_unload_fix;
        if let Some(workers) = self.workers {
            pipeline.workers = workers;
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    tracing::debug!("smfix {} built {}", VERSION, BUILD_DATE);

    let mut config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;
    cli.apply(&mut config);

    let result = if cli.dump_params {
        dump_params(&cli.input, &config).map(|json| println!("{}", json))
    } else {
        process_file(&cli.input, cli.output.as_deref(), &config).map(|_| ())
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_already_processed() => {
            tracing::warn!("{} was already processed, leaving it alone", cli.input.display());
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("Failed to process {}", cli.input.display())),
    }
}
