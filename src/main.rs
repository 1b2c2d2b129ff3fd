use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use urzasight::ocr::{CaptureRequest, CropRegion, RecognitionMode, list_tesseract_languages};
use urzasight::providers::resolve_key;
use urzasight::settings::{self, Settings};
use urzasight::{Explainer, Reader, server};

#[derive(Parser, Debug)]
#[command(
    name = "urzasight",
    version,
    about = "Read Japanese text from manga captures and explain it"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// OpenAI API key (overrides settings and OPENAI_API_KEY)
    #[arg(short = 'k', long = "key", global = true)]
    key: Option<String>,

    /// Model used for explanations
    #[arg(short = 'm', long = "model", global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Listen address (default from settings [server].addr)
        #[arg(long = "addr")]
        addr: Option<String>,
    },
    /// Recognize text in an image and print the analysis as JSON
    Read {
        image: PathBuf,
        #[command(flatten)]
        capture: CaptureArgs,
        /// Also write the preprocessed buffer to this path
        #[arg(long = "save-preprocessed")]
        save_preprocessed: Option<PathBuf>,
    },
    /// Write the preprocessed image without running recognition
    Preprocess {
        image: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        capture: CaptureArgs,
    },
    /// Explain a Japanese sentence
    Explain {
        text: String,
        /// Optional scene or speaker context
        #[arg(short = 'c', long = "context", default_value = "")]
        context: String,
    },
    /// List installed tesseract languages
    Languages,
}

#[derive(Args, Debug)]
struct CaptureArgs {
    /// Crop left edge
    #[arg(long = "x", default_value_t = 0, allow_negative_numbers = true)]
    x: i32,
    /// Crop top edge
    #[arg(long = "y", default_value_t = 0, allow_negative_numbers = true)]
    y: i32,
    /// Crop width (0 = whole image)
    #[arg(long = "width", default_value_t = 0, allow_negative_numbers = true)]
    width: i32,
    /// Crop height (0 = whole image)
    #[arg(long = "height", default_value_t = 0, allow_negative_numbers = true)]
    height: i32,
    /// Text runs left to right (disables rotation of landscape crops)
    #[arg(long = "horizontal")]
    horizontal: bool,
    /// Layout assumption: auto, column or line
    #[arg(long = "mode", default_value = "auto")]
    mode: String,
}

impl CaptureArgs {
    fn request(&self) -> Result<CaptureRequest> {
        Ok(CaptureRequest {
            region: CropRegion::new(self.x, self.y, self.width, self.height),
            vertical: !self.horizontal,
            mode: self.mode.parse::<RecognitionMode>()?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    urzasight::logging::init(cli.verbose)?;

    let mut settings = settings::load_settings(cli.read_settings.as_deref().map(Path::new))?;
    if let Some(model) = cli.model.as_deref()
        && !model.trim().is_empty()
    {
        settings.explain.model = model.trim().to_string();
    }

    match cli.command {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                settings.server.addr = addr;
            }
            let explainer = build_explainer(&settings, cli.key.as_deref());
            server::run_server(settings, explainer).await
        }
        Command::Read {
            image,
            capture,
            save_preprocessed,
        } => run_read(&settings, &image, &capture, save_preprocessed.as_deref()),
        Command::Preprocess {
            image,
            output,
            capture,
        } => run_preprocess(&settings, &image, &output, &capture),
        Command::Explain { text, context } => {
            let explainer = build_explainer(&settings, cli.key.as_deref());
            let explanation = explainer.explain(&text, &context).await;
            if explanation.ok {
                println!("{}", explanation.explanation);
                Ok(())
            } else {
                eprintln!("{}", explanation.explanation);
                std::process::exit(1);
            }
        }
        Command::Languages => run_languages(&settings),
    }
}

fn build_explainer(settings: &Settings, key: Option<&str>) -> Explainer {
    let key = resolve_key(key, settings.explain.api_key.as_deref());
    if key.is_none() {
        info!("no OpenAI API key configured; using the offline template");
    }
    Explainer::from_settings(&settings.explain, key)
}

fn open_image(path: &Path) -> Result<image::RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image: {}", path.display()))?;
    Ok(image.to_rgba8())
}

fn run_read(
    settings: &Settings,
    path: &Path,
    capture: &CaptureArgs,
    save_preprocessed: Option<&Path>,
) -> Result<()> {
    let request = capture.request()?;
    let reader = Reader::from_settings(settings);
    let prepared = reader.preprocess(open_image(path)?, &request)?;
    if let Some(out) = save_preprocessed {
        prepared
            .save(out)
            .with_context(|| format!("failed to write image: {}", out.display()))?;
    }
    let analysis = reader.analyze_prepared(&prepared, &request)?;
    println!("{}", serde_json::to_string_pretty(&analysis)?);
    Ok(())
}

fn run_preprocess(
    settings: &Settings,
    path: &Path,
    output: &Path,
    capture: &CaptureArgs,
) -> Result<()> {
    let request = capture.request()?;
    let reader = Reader::from_settings(settings);
    let prepared = reader.preprocess(open_image(path)?, &request)?;
    prepared
        .save(output)
        .with_context(|| format!("failed to write image: {}", output.display()))?;
    println!(
        "{} ({}x{})",
        output.display(),
        prepared.width(),
        prepared.height()
    );
    Ok(())
}

fn run_languages(settings: &Settings) -> Result<()> {
    for lang in list_tesseract_languages(&settings.ocr.tesseract)? {
        println!("{}", lang);
    }
    let missing = settings.ocr.tesseract().missing_languages()?;
    if !missing.is_empty() {
        eprintln!("missing: {}", missing.join(", "));
    }
    Ok(())
}
