//! sopchunk CLI - SOP document to RAG chunk converter

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use sopchunk::render::{read_outline, to_json, write_flat_csv};
use sopchunk::{
    chunk_file_with_options, process_file_with_options, BatchProcessor, CsvLayout, DocxParser,
    JsonFormat, OutputKind, ProcessOptions, ProcessReport, ProcessingStats, RuleSet,
};

#[derive(Parser)]
#[command(name = "sopchunk")]
#[command(author = "sopchunk contributors")]
#[command(version)]
#[command(about = "Convert SOP Word documents into RAG-ready CSV and JSON", long_about = None)]
struct Cli {
    /// Input .docx file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args, Clone)]
struct CommonArgs {
    /// Image directory (relative paths resolve against the output directory)
    #[arg(long, value_name = "DIR", env = "SOPCHUNK_IMAGE_DIR", global = true)]
    image_dir: Option<PathBuf>,

    /// Write the extended CSV layout with section path and kind columns
    #[arg(long, global = true)]
    extended: bool,

    /// JSON file with attribution rules replacing the built-in ones
    #[arg(long, value_name = "FILE", global = true)]
    rules: Option<PathBuf>,

    /// Outputs to write
    #[arg(long, value_enum, default_value = "csv", global = true)]
    format: Format,

    /// Fail on damaged package parts instead of skipping them
    #[arg(long, global = true)]
    strict: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document to chunk CSV and images
    Convert {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,
    },

    /// Print or save the JSON outline of a document
    Json {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Convert every document in a directory or ZIP archive
    Batch {
        /// Directory or .zip archive
        #[arg(value_name = "DIR|ZIP")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Process documents in parallel
        #[arg(long)]
        parallel: bool,
    },

    /// Flatten a JSON outline into a CSV of section records
    Flatten {
        /// JSON outline file
        #[arg(value_name = "JSON")]
        input: PathBuf,

        /// Output CSV file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Show document structure statistics
    Info {
        /// Input .docx file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Chunk CSV only (default)
    Csv,
    /// JSON outline only
    Json,
    /// CSV and JSON
    All,
}

impl From<Format> for OutputKind {
    fn from(format: Format) -> Self {
        match format {
            Format::Csv => OutputKind::Csv,
            Format::Json => OutputKind::Json,
            Format::All => OutputKind::All,
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let common = cli.common;

    let result = match cli.command {
        Some(Commands::Convert { input, output }) => cmd_convert(&input, output.as_deref(), &common),
        Some(Commands::Json {
            input,
            output,
            compact,
        }) => cmd_json(&input, output.as_deref(), compact, &common),
        Some(Commands::Batch {
            input,
            output,
            parallel,
        }) => cmd_batch(&input, output.as_deref(), parallel, &common),
        Some(Commands::Flatten { input, output }) => cmd_flatten(&input, output.as_deref()),
        Some(Commands::Info { input }) => cmd_info(&input, &common),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &common)
            } else {
                println!("{}", "Usage: sopchunk <FILE> [OUTPUT]".yellow());
                println!("       sopchunk --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn build_options(common: &CommonArgs) -> CliResult<ProcessOptions> {
    let mut options = ProcessOptions::new().with_outputs(common.format.into());

    if common.extended {
        options = options.with_csv_layout(CsvLayout::Extended);
    }
    if let Some(ref dir) = common.image_dir {
        options = options.with_image_dir(dir.clone());
    }
    if let Some(ref path) = common.rules {
        options = options.with_rules(RuleSet::from_file(path)?);
    }
    if !common.strict {
        options.parse = options.parse.lenient();
    }

    Ok(options)
}

fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input.file_stem().unwrap_or_default().to_string_lossy();
    PathBuf::from(format!("{}_chunks", stem))
}

fn cmd_convert(input: &Path, output: Option<&Path>, common: &CommonArgs) -> CliResult<()> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| default_output_dir(input));
    let options = build_options(common)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(format!("Processing {}...", input.display()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let report = process_file_with_options(input, &output_dir, &options);
    spinner.finish_and_clear();
    let report = report?;

    println!(
        "{} {} ({} chunks, {} images)",
        "Processed".green().bold(),
        input.display(),
        report.stats.chunk_count,
        report.images_written
    );
    print_outputs(&report);

    Ok(())
}

fn print_outputs(report: &ProcessReport) {
    let outputs = report.outputs();
    println!("\n{}", "Output files:".green().bold());
    for (i, path) in outputs.iter().enumerate() {
        let branch = if i + 1 == outputs.len() { "└─" } else { "├─" };
        println!("  {} {}", branch.dimmed(), path.display());
    }
}

fn cmd_json(input: &Path, output: Option<&Path>, compact: bool, common: &CommonArgs) -> CliResult<()> {
    let options = build_options(common)?;
    let set = chunk_file_with_options(input, &options)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = to_json(&set.outline, format)?;

    if let Some(path) = output {
        fs::write(path, &json)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn cmd_batch(input: &Path, output: Option<&Path>, parallel: bool, common: &CommonArgs) -> CliResult<()> {
    let output_dir = output
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("sopchunk_output"));
    fs::create_dir_all(&output_dir)?;

    let processor = BatchProcessor::new(build_options(common)?).with_parallel(parallel);
    let inputs = processor.collect_inputs(input, &output_dir)?;
    if inputs.is_empty() {
        println!("{} no documents found in {}", "Warning:".yellow().bold(), input.display());
        return Ok(());
    }

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    let report = processor.run_paths(&inputs, &output_dir, |path, outcome| {
        let name = path.file_name().unwrap_or_default().to_string_lossy();
        match outcome {
            Ok(done) => pb.println(format!(
                "{} {} ({} chunks)",
                "✓".green(),
                name,
                done.stats.chunk_count
            )),
            Err(e) => pb.println(format!("{} {}: {}", "✗".red(), name, e)),
        }
        pb.inc(1);
    });
    pb.finish_and_clear();

    println!();
    println!("{}", "Batch Summary".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    println!("{}: {}", "Documents".bold(), report.total());
    println!("{}: {}", "Succeeded".bold(), report.success_count().to_string().green());
    println!("{}: {}", "Failed".bold(), report.failure_count().to_string().red());
    println!("{}: {}", "Chunks".bold(), report.stats.chunk_count);
    println!("{}: {}", "Images".bold(), report.stats.image_count);
    println!("{}: {}", "Output".bold(), output_dir.display());

    let report_path = output_dir.join("batch_report.json");
    fs::write(&report_path, serde_json::to_string_pretty(&report)?)?;
    log::info!("wrote batch report to {}", report_path.display());

    if !report.is_success() {
        println!("\n{}", "Failures:".red().bold());
        for failure in &report.failures {
            println!("  {} {}: {}", "-".dimmed(), failure.path.display(), failure.message);
        }
        return Err(format!("{} of {} documents failed", report.failure_count(), report.total()).into());
    }

    Ok(())
}

fn cmd_flatten(input: &Path, output: Option<&Path>) -> CliResult<()> {
    let outline = read_outline(input)?;
    let records = outline.flatten();

    let output_path = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        input.with_file_name(format!("{}_chunks.csv", stem))
    });

    write_flat_csv(&output_path, &records)?;
    println!(
        "{} {} records to {}",
        "Flattened".green().bold(),
        records.len(),
        output_path.display()
    );

    Ok(())
}

fn cmd_info(input: &Path, common: &CommonArgs) -> CliResult<()> {
    let options = build_options(common)?;
    let set = chunk_file_with_options(input, &options)?;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "SOP ID".bold(), set.identity.id);
    println!("{}: {}", "SOP Name".bold(), set.outline.sop_name);
    println!("{}: {}", "Sections".bold(), set.outline.heading_count());

    let metadata = DocxParser::open(input)?.metadata()?;
    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref editor) = metadata.last_modified_by {
        println!("{}: {}", "Last Modified By".bold(), editor);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created);
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified);
    }

    println!();
    println!("{}", "Structure Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());
    print_stats(&set.stats);

    let unbound = set.unbound_images().len();
    if unbound > 0 {
        println!("{}: {}", "Unbound images".yellow().bold(), unbound);
    }

    Ok(())
}

fn print_stats(stats: &ProcessingStats) {
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Images".bold(), stats.image_count);
    println!("{}: {}", "Captions".bold(), stats.caption_count);
    println!(
        "{}: {} (forced {}, numeric {}, keyword {}, band {}, fallback {})",
        "Images bound".bold(),
        stats.bound_total(),
        stats.bound_forced,
        stats.bound_numeric,
        stats.bound_keyword,
        stats.bound_band,
        stats.bound_fallback
    );
    println!(
        "{}: {} ({} tables)",
        "Chunks".bold(),
        stats.chunk_count,
        stats.table_chunk_count
    );
    println!("{}: {}", "Dropped preamble".bold(), stats.dropped_preamble);
}

fn cmd_version() {
    println!("{} {}", "sopchunk".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("SOP document to RAG chunk converter");
    println!();
    println!("License: MIT");
}
