use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use upscaler::{Invocation, UpscaleError};

/// Upscale an image with a super-resolution network or classical interpolation.
#[derive(Parser)]
#[command(name = "upscaler", version)]
struct Cli {
    /// Image to upscale
    input: PathBuf,

    /// Where to write the result; missing directories are created
    output: PathBuf,

    /// Checkpoint for espcn, edsr and srgan (`hf://owner/repo/file` downloads from the Hub)
    weights: PathBuf,

    /// One of espcn, edsr, srgan, bilinear, bicubic
    model_name: String,

    /// Integer upscaling factor
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    scale: u32,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let result = Invocation::new(cli.input, cli.output, cli.weights, &cli.model_name, cli.scale)
        .and_then(|invocation| upscaler::run(&invocation).map(|()| invocation));

    match result {
        Ok(invocation) => {
            println!("RESULT_PATH:{}", invocation.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => fail(&err),
    }
}

fn fail(err: &UpscaleError) -> ExitCode {
    let _ = err.report(&mut std::io::stderr().lock());
    ExitCode::from(err.exit_code())
}
