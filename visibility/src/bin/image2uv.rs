//! Compute visibility amplitude and phase maps of a FITS brightness image.
//!
//! The image is zero-padded to at least `-p` pixels per axis, Fourier
//! transformed and re-centered. Phases are referenced to the grid center,
//! or to the brightness centroid with `-c`. Output is a FITS file with the
//! amplitudes in the primary HDU and the phases in the first extension.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use visibility::config::{parse_pad_size, Image2UvConfig};
use visibility::logging::{init_logging, Verbosity};
use visibility::prompt::Prompter;
use visibility::{image_to_uv, PipelineError};

#[derive(Parser, Debug)]
#[command(
    name = "image2uv",
    version,
    about = "Compute the visibility amplitudes and phases of a FITS image",
    arg_required_else_help = true
)]
struct Args {
    #[arg(help = "Input FITS brightness image")]
    input: PathBuf,

    #[arg(short, long, help = "Output FITS file [default: uvout.fits]")]
    output: Option<PathBuf>,

    #[arg(short, long, help = "Silent mode, errors only")]
    silent: bool,

    #[arg(
        short,
        long,
        help = "Verbose mode, asks for padding, centering and output file"
    )]
    verbose: bool,

    #[arg(
        short = 'p',
        long = "pad",
        value_name = "N",
        value_parser = parse_pad_size,
        help = "Zero-pad the image to at least N pixels per axis"
    )]
    pad_size: Option<usize>,

    #[arg(
        short = 'c',
        long = "center",
        help = "Reference phases to the brightness centroid"
    )]
    center_on_brightness: bool,

    #[arg(long, value_name = "JSON", help = "Read settings from a JSON file")]
    config: Option<PathBuf>,
}

fn ask_settings(settings: Image2UvConfig) -> Result<Image2UvConfig> {
    let mut prompter = Prompter::terminal()?;
    let output = settings.output_path();

    let pad_size = prompter.ask_pad_size(settings.pad_size.unwrap_or(0))?;
    let center = prompter.ask_yes_no(
        "Center phases on brightness (y/n)?",
        settings.center_on_brightness.unwrap_or(false),
    )?;
    let output = prompter.ask_text("Output file", &output.to_string_lossy())?;

    Ok(Image2UvConfig {
        output: Some(PathBuf::from(output)),
        pad_size: (pad_size > 0).then_some(pad_size),
        center_on_brightness: Some(center),
    })
}

fn run(args: Args) -> Result<()> {
    let from_file = match &args.config {
        Some(path) => Image2UvConfig::load_from_file(path).map_err(PipelineError::from)?,
        None => Image2UvConfig::default(),
    };
    let mut settings = from_file.merged_with(Image2UvConfig {
        output: args.output,
        pad_size: args.pad_size,
        center_on_brightness: args.center_on_brightness.then_some(true),
    });

    if args.verbose && !args.silent {
        settings = ask_settings(settings).context("reading interactive answers")?;
    }

    let output = settings.output_path();
    let config = settings.pipeline_config();
    info!(
        "transforming {} -> {} (pad {}, {} center)",
        args.input.display(),
        output.display(),
        config.pad_size,
        config.center
    );

    image_to_uv(&args.input, &output, config)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_logging(Verbosity::from_flags(args.silent, args.verbose));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("image2uv: {e:#}");
            ExitCode::FAILURE
        }
    }
}
