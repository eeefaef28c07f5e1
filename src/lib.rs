//! # SMFix
//!
//! A G-code post-processor for Snapmaker printers, dual-extruder and IDEX
//! machines in particular. Run as a slicer post-processing script, it:
//! - folds slicer tool indices onto the two physical nozzles
//! - shuts nozzles off after their last use
//! - moves reheats earlier and drops repeated temperature commands
//! - reinforces prime tower wipes
//! - removes tool unload commands that have no target tool
//! - writes the metadata header the firmware reads before printing
//!
//! ## Architecture
//!
//! 1. **smfix-core** - Tokens, blocks, sequences, errors, parallel scans
//! 2. **smfix-settings** - TOML configuration
//! 3. **smfix-passes** - The transformation passes and their pipeline
//! 4. **smfix-header** - Parameter scraping and firmware header layouts
//! 5. **smfix** - This crate: file processing glue and the binary

use std::fs;
use std::io::Write;
use std::path::Path;

pub use smfix_core::{Error, GcodeError, Result, Sequence, MARK};
pub use smfix_header::HeaderParams;
pub use smfix_passes::PassPipeline;
pub use smfix_settings::Config;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Result of processing one file's text
#[derive(Debug, Clone)]
pub struct Processed {
    /// Parameters the header was built from
    pub params: HeaderParams,
    /// Header followed by the rewritten body
    pub text: String,
}

/// Run the pipeline over G-code text and prepend the firmware header
///
/// Fails without doing anything when the text was already processed.
pub fn process_text(text: &str, config: &Config) -> Result<Processed> {
    let sequence = Sequence::parse(text)?;
    let input_lines = sequence.len();

    let pipeline = PassPipeline::from_config(config);
    let sequence = pipeline.run(sequence);

    let params = HeaderParams::from_sequence(&sequence, &config.header);
    let mut output = smfix_header::render_header(&params);
    output.push_str(&sequence.to_text());

    tracing::info!(
        "Processed {} lines into {} (header v{})",
        input_lines,
        sequence.len(),
        params.version
    );
    Ok(Processed {
        params,
        text: output,
    })
}

/// Read a G-code file; invalid UTF-8 is replaced rather than rejected
pub fn read_gcode(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Process `input` and write the result to `output`, or over `input`
///
/// The result is written to a temporary file next to the destination and
/// moved into place only once everything succeeded.
pub fn process_file(input: &Path, output: Option<&Path>, config: &Config) -> Result<HeaderParams> {
    let text = read_gcode(input)?;
    let processed = process_text(&text, config)?;

    let destination = output.unwrap_or(input);
    let directory = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(directory)?;
    tmp.write_all(processed.text.as_bytes())?;
    tmp.flush()?;
    tmp.persist(destination).map_err(|e| Error::Io(e.error))?;

    tracing::info!("Wrote {}", destination.display());
    Ok(processed.params)
}

/// Header parameters of `input` as pretty JSON; nothing is written
pub fn dump_params(input: &Path, config: &Config) -> Result<String> {
    let text = read_gcode(input)?;
    let processed = process_text(&text, config)?;
    let json = processed.params.to_json().map_err(std::io::Error::from)?;
    Ok(json)
}

/// Initialize logging
///
/// Logs go to stderr so output piped from `--dump-params` stays clean.
/// `RUST_LOG` is honoured; the default level is INFO, or DEBUG when
/// `verbose` is set.
pub fn init_logging(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let env_filter = EnvFilter::from_default_env().add_directive(level.into());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
