#![warn(unused_extern_crates)]
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use face_select::config::Config;
use face_select::decode::EncodedImage;
use face_select::encode::AnalysisResult;
use face_select::error::AnalysisError;
use face_select::pipeline::{Analyzer, InsightFace, health_check};
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct CmdArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pick the best face out of a batch of images and print its record
    Analyze(AnalyzeArgs),

    /// Print service health
    Health,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    config: Config,

    #[command(flatten)]
    input: Input,
}

#[derive(Args, Debug)]
#[group(multiple = false)]
struct Input {
    /// JSON request file, {"images": ["<base64>", ...]}. Read from stdin if
    /// neither this nor --image is given
    #[arg(short, long, value_name = "FILE")]
    request: Option<PathBuf>,

    /// Image files making up the batch, in order
    #[arg(short, long, value_name = "PATH", num_args = 1..)]
    image: Vec<PathBuf>,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    images: Vec<EncodedImage>,
}

#[derive(Serialize)]
struct AnalyzeResponse<'a> {
    result: &'a AnalysisResult,
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = CmdArgs::parse();

    match args.command {
        Command::Health => {
            println!("{}", serde_json::to_string(&health_check())?);
            Ok(())
        }
        Command::Analyze(args) => analyze(args),
    }
}

fn analyze(args: AnalyzeArgs) -> Result<()> {
    args.config.validate()?;
    let images = read_images(args.input)?;

    let start = Instant::now();
    let model = InsightFace::new(&args.config.model)?;
    debug!("Took {:?} to load models", start.elapsed());

    let analyzer = Analyzer::new(model, &args.config);
    match analyzer.analyze(&images) {
        Ok(result) => {
            println!("{}", serde_json::to_string(&AnalyzeResponse { result: &result })?);
            info!("Done");
            Ok(())
        }
        Err(e @ AnalysisError::NoValidFace) => {
            let body = ErrorResponse {
                detail: e.to_string(),
            };
            println!("{}", serde_json::to_string(&body)?);
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn read_images(input: Input) -> Result<Vec<EncodedImage>> {
    if !input.image.is_empty() {
        return input
            .image
            .iter()
            .map(|p| -> Result<EncodedImage> {
                let bytes = std::fs::read(p).with_context(|| format!("reading {}", p.display()))?;
                Ok(EncodedImage::from_bytes(&bytes))
            })
            .collect();
    }

    let body = match input.request {
        Some(p) => {
            std::fs::read_to_string(&p).with_context(|| format!("reading {}", p.display()))?
        }
        None => {
            let mut body = String::new();
            std::io::stdin().read_to_string(&mut body)?;
            body
        }
    };

    let request: AnalyzeRequest = serde_json::from_str(&body).context("parsing request")?;
    Ok(request.images)
}
