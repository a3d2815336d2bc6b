//! Render an analytic brightness model to a FITS image.
//!
//! Known models are `gauss` (sum of elliptical Gaussians) and `crescent`.
//! Parameters are passed as `-d Ncomp,p1,p2,...`; without `-d` the model's
//! default single-component parameters are used.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use visibility::io::write_brightness_image;
use visibility::logging::{init_logging, Verbosity};
use visibility::models::{DEFAULT_PIXELS, DEFAULT_PIXEL_SIZE_UAS};
use visibility::prompt::Prompter;
use visibility::{BrightnessSource, ImageModel, ModelKind, ModelParams, ModelSource};

#[derive(Parser, Debug)]
#[command(
    name = "synthimage",
    version,
    about = "Create a synthetic FITS image from an analytic brightness model",
    arg_required_else_help = true
)]
struct Args {
    #[arg(help = "Output FITS file")]
    output: PathBuf,

    #[arg(
        short = 'p',
        long = "pixels",
        default_value_t = DEFAULT_PIXELS,
        help = "Number of pixels per side (at most 4096)"
    )]
    npixel: usize,

    #[arg(
        short = 'c',
        long = "pixel-size",
        default_value_t = DEFAULT_PIXEL_SIZE_UAS,
        help = "Pixel size in micro-arcseconds"
    )]
    pixel_size: f64,

    #[arg(
        short = 'm',
        long,
        default_value = "gauss",
        help = "Model name: gauss or crescent"
    )]
    model: ModelKind,

    #[arg(
        short = 'd',
        long = "params",
        value_name = "NCOMP,P1,P2,...",
        allow_hyphen_values = true,
        help = "Model parameters, preceded by the number of components"
    )]
    params: Option<ModelParams>,

    #[arg(short, long, help = "Silent mode, errors only")]
    silent: bool,

    #[arg(short, long, help = "Verbose mode, asks for every setting")]
    verbose: bool,
}

struct Settings {
    npixel: usize,
    pixel_size: f64,
    model: ModelKind,
    params: ModelParams,
}

fn ask_settings(mut settings: Settings) -> Result<Settings> {
    let mut prompter = Prompter::terminal()?;

    settings.npixel = prompter.ask_value("Number of pixels per side", settings.npixel)?;
    settings.pixel_size = prompter.ask_value("Pixel size (uas)", settings.pixel_size)?;

    let model = prompter.ask_value("Model (gauss, crescent)", settings.model)?;
    if model != settings.model {
        settings.params = model.default_params();
        settings.model = model;
    }

    for (i, description) in model.param_descriptions().iter().enumerate() {
        eprintln!("  parameter {}: {description}", i + 1);
    }
    settings.params = prompter.ask_value("Parameters (Ncomp,p1,p2,...)", settings.params)?;
    Ok(settings)
}

fn run(args: Args) -> Result<()> {
    let mut settings = Settings {
        npixel: args.npixel,
        pixel_size: args.pixel_size,
        model: args.model,
        params: args.params.unwrap_or_else(|| args.model.default_params()),
    };

    if args.verbose && !args.silent {
        settings = ask_settings(settings).context("reading interactive answers")?;
    }

    let model = ImageModel::from_params(settings.model, &settings.params).with_context(|| {
        format!(
            "model {} with parameters {}",
            settings.model, settings.params
        )
    })?;
    let source = ModelSource::new(model, settings.npixel, settings.pixel_size);
    source.validate()?;

    info!(
        "rendering {} model on {} x {} pixels of {} uas",
        settings.model, settings.npixel, settings.npixel, settings.pixel_size
    );
    let image = source.load()?;
    info!("total flux {:.6}", image.total_flux());

    write_brightness_image(&args.output, &image, &source.describe())?;
    info!("image written to {}", args.output.display());
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
            eprintln!("synthimage: {e:#}");
            ExitCode::FAILURE
        }
    }
}
