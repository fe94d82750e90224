use clap::{Parser, Subcommand};
use image_toolkit::batch::{self, BatchJob};
use image_toolkit::config::{self, CONFIG_FILE_NAME, ToolConfig};
use image_toolkit::imaging::{
    OutputFormat, ResizePreset, Rgb, RustBackend, TransformOptions, WatermarkPosition,
};
use image_toolkit::package::{DirectorySink, Packager};
use image_toolkit::store::ImageStore;
use image_toolkit::{input, output};
use std::path::{Path, PathBuf};

/// Inputs and run mode shared by every tool.
#[derive(clap::Args, Clone)]
struct BatchArgs {
    /// Image files or directories (directories are scanned recursively)
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Print what each image would become without encoding anything
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser)]
#[command(name = "image-toolkit")]
#[command(about = "Batch image conversion, compression, resizing and watermarking")]
#[command(long_about = "\
Batch image conversion, compression, resizing and watermarking

Every input image is processed by one tool, in the order given. A single
result is saved as-is; two or more results are bundled into one ZIP archive.

Output filenames:
  convert    beach.png → beach.webp
  resize     beach.png → beach_resized.jpg
  watermark  beach.png → beach_watermarked.jpg
  compress   beach.png → beach_compressed.jpg

Images that fail to process are reported and skipped; the rest of the batch
is still delivered.

Defaults come from image-toolkit.toml; command-line flags override it.
Run 'image-toolkit gen-config' to generate a documented config file.")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(long, default_value = CONFIG_FILE_NAME, global = true)]
    config: PathBuf,

    /// Directory the result is saved into
    #[arg(long, default_value = "output", global = true)]
    output: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Re-encode images to PNG, JPEG or WebP
    Convert {
        #[command(flatten)]
        batch: BatchArgs,
        /// Target format: png, jpeg, webp
        #[arg(long)]
        format: Option<OutputFormat>,
        /// Lossy quality (1-100, out-of-range values are clamped)
        #[arg(long, allow_negative_numbers = true)]
        quality: Option<i64>,
        /// Matte color behind transparent pixels, e.g. "#ffffff"
        #[arg(long)]
        background: Option<Rgb>,
        /// Apply the matte to PNG and WebP output as well
        #[arg(long)]
        apply_background: bool,
    },
    /// Scale images to a target size
    Resize {
        #[command(flatten)]
        batch: BatchArgs,
        /// Named size: thumbnail, social-media, hd, square
        #[arg(long)]
        preset: Option<ResizePreset>,
        /// Target width in pixels (overrides the preset)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,
        /// Target height in pixels (overrides the preset)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,
        /// Use width and height exactly instead of deriving height from the aspect ratio
        #[arg(long)]
        ignore_aspect: bool,
    },
    /// Stamp text onto images
    Watermark {
        #[command(flatten)]
        batch: BatchArgs,
        /// Watermark text
        #[arg(long)]
        text: Option<String>,
        /// Font size in pixels
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        font_size: Option<u32>,
        /// Text opacity (0.0-1.0, out-of-range values are clamped)
        #[arg(long, allow_negative_numbers = true)]
        opacity: Option<f32>,
        /// top-left, top-center, top-right, center-left, center, center-right,
        /// bottom-left, bottom-center, bottom-right
        #[arg(long)]
        position: Option<WatermarkPosition>,
        /// Text color, e.g. "#ffffff"
        #[arg(long)]
        color: Option<Rgb>,
        /// TTF/OTF font file (defaults to the embedded font)
        #[arg(long)]
        font: Option<PathBuf>,
    },
    /// Re-encode images as JPEG at a lower quality
    Compress {
        #[command(flatten)]
        batch: BatchArgs,
        /// JPEG quality (1-100, out-of-range values are clamped)
        #[arg(long, allow_negative_numbers = true)]
        quality: Option<i64>,
    },
    /// List images with their format, dimensions and size
    Inspect {
        /// Image files or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a stock image-toolkit.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut config = config::load_config(&cli.config)?;
    init_thread_pool(&config.processing);

    match cli.command {
        Command::Convert {
            batch,
            format,
            quality,
            background,
            apply_background,
        } => {
            let c = &mut config.convert;
            c.format = format.unwrap_or(c.format);
            c.quality = quality.unwrap_or(c.quality);
            c.background = background.unwrap_or(c.background);
            c.apply_background |= apply_background;
            let options = TransformOptions::Convert(config.convert.to_options());
            run_tool(&cli.output, &config, RustBackend::new(), &batch, options)?;
        }
        Command::Resize {
            batch,
            preset,
            width,
            height,
            ignore_aspect,
        } => {
            let r = &mut config.resize;
            if let Some((w, h)) = preset.map(ResizePreset::dimensions) {
                r.width = w;
                r.height = h;
            }
            r.width = width.unwrap_or(r.width);
            r.height = height.unwrap_or(r.height);
            if ignore_aspect {
                r.maintain_aspect_ratio = false;
            }
            let options = TransformOptions::Resize(config.resize.to_options());
            run_tool(&cli.output, &config, RustBackend::new(), &batch, options)?;
        }
        Command::Watermark {
            batch,
            text,
            font_size,
            opacity,
            position,
            color,
            font,
        } => {
            let w = &mut config.watermark;
            w.text = text.unwrap_or(std::mem::take(&mut w.text));
            w.font_size = font_size.unwrap_or(w.font_size);
            w.opacity = opacity.unwrap_or(w.opacity);
            w.position = position.unwrap_or(w.position);
            w.color = color.unwrap_or(w.color);
            w.font = font.or(w.font.take());
            config.validate()?;

            let backend = match &config.watermark.font {
                Some(path) => RustBackend::with_font_file(path)?,
                None => RustBackend::new(),
            };
            let options = TransformOptions::Watermark(config.watermark.to_options());
            run_tool(&cli.output, &config, backend, &batch, options)?;
        }
        Command::Compress { batch, quality } => {
            config.compress.quality = quality.unwrap_or(config.compress.quality);
            let options = TransformOptions::Compress(config.compress.to_options());
            run_tool(&cli.output, &config, RustBackend::new(), &batch, options)?;
        }
        Command::Inspect { inputs, json } => {
            let store = load_store(&RustBackend::new(), &inputs)?;
            if json {
                let summaries: Vec<_> = store.records().iter().map(|r| r.summary()).collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                output::print_records(store.records());
            }
        }
        // Printed before the config file is read.
        Command::GenConfig => {}
    }

    Ok(())
}

/// Read the inputs into a fresh store and report what was loaded.
fn load_store(
    backend: &RustBackend,
    inputs: &[PathBuf],
) -> Result<ImageStore, Box<dyn std::error::Error>> {
    let files = input::read_inputs(inputs)?;
    let mut store = ImageStore::new();
    let report = store.add_images(backend, files);
    output::print_ingest_report(&report);
    Ok(store)
}

/// Ingest, run one tool over every record, and save the delivery.
fn run_tool(
    output_dir: &Path,
    config: &ToolConfig,
    backend: RustBackend,
    args: &BatchArgs,
    options: TransformOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = load_store(&backend, &args.inputs)?;

    if args.dry_run {
        output::print_plan(&batch::plan_batch(store.records(), &options));
        return Ok(());
    }

    let packager = Packager::new(config.archive.name.as_str());
    let sink = DirectorySink::new(output_dir);
    let mut job = BatchJob::new();

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    let result = batch::run_and_deliver(
        &backend,
        store.records(),
        &options,
        &packager,
        &sink,
        &mut job,
        Some(tx),
    );
    printer.join().unwrap();

    let outcome = result?;
    output::print_delivery(&outcome.delivery, outcome.saved_to.as_deref());
    Ok(())
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the config can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
