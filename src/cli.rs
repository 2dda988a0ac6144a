// ============================================================================
// Inkmark CLI — headless export via command-line arguments
// ============================================================================
//
// Usage examples:
//   inkmark --input shot.json --output shot.png
//   inkmark -i photo.jpg -o out.png                 (format inferred from output ext)
//   inkmark -i a.json b.json --output-dir exported/ --format jpeg
//
// No GUI is opened in CLI mode. Each input (a session file or a plain image)
// is loaded, its edits replayed and cropped, and the flattened result written
// out synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::io::{export_image, flatten, load_session_or_image, SaveFormat};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Inkmark headless exporter.
///
/// Flatten session files or convert images between formats — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "inkmark",
    about = "Inkmark headless image exporter",
    long_about = "Flatten .json session files (crop and drawings applied) or convert\n\
                  plain images between formats without opening the GUI. Supports PNG,\n\
                  JPEG, WEBP and BMP output.\n\n\
                  Example:\n  \
                  inkmark --input shot.json --output shot.png\n  \
                  inkmark -i a.json b.json --output-dir exported/ --format jpeg"
)]
pub struct CliArgs {
    /// Input file(s): .json session files or any supported image format.
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<PathBuf>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp, bmp.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any CLI-mode flag is present in the real process arguments.
    /// Used by `main()` to route before creating an eframe window.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| a == "--input" || a == "-i")
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    if args.input.is_empty() {
        eprintln!("error: no input files given.");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if args.input.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            args.input.len()
        );
        return ExitCode::FAILURE;
    }

    let save_format = parse_format(args.format.as_deref(), args.output.as_deref());

    // Create output directory if specified
    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = args.input.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in args.input.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            save_format,
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match run_one(input_path, &output_path) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(input: &Path, output: &Path) -> Result<(), String> {
    let session = load_session_or_image(input).map_err(|e| format!("load failed: {}", e))?;
    let flat = flatten(&session);
    export_image(&flat, output).map_err(|e| format!("save failed: {}", e))
}

// ============================================================================
// Helpers
// ============================================================================

/// Choose the [`SaveFormat`] from the `--format` string or infer it from the
/// output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> SaveFormat {
    if let Some(f) = format_arg {
        return SaveFormat::from_extension(f).unwrap_or(SaveFormat::Png);
    }
    if let Some(out) = output {
        return SaveFormat::from_path(out).unwrap_or(SaveFormat::Png);
    }
    SaveFormat::Png
}

fn format_extension(format: SaveFormat) -> &'static str {
    match format {
        SaveFormat::Png => "png",
        SaveFormat::Jpeg => "jpg",
        SaveFormat::Webp => "webp",
        SaveFormat::Bmp => "bmp",
    }
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: SaveFormat,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format_extension(format);
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}
