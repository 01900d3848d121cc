use anyhow::Context;
use clap::Parser;
use console::{style, Term};
use std::path::PathBuf;
use tracing::{info, Level};

use oar::{
    convert, ConversionOutput, ConversionRequest, DEFAULT_CODEC, DEFAULT_MAX_BITRATE_BPS,
    DEFAULT_MAX_QUALITY_DIFFERENCE, DEFAULT_OUTPUT_PATH,
};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{format_kbps, DEFAULT_MAX_ITERATIONS, DEFAULT_WORK_DIR};

#[derive(Parser, Debug)]
#[command(name = "oar")]
#[command(version, about = "Convert audio at the highest quality that fits under a maximum bitrate", long_about = None)]
struct Cli {
    #[arg(value_name = "INPUT", help = "Input audio file path.")]
    input: PathBuf,

    #[arg(short = 'b', long, default_value_t = DEFAULT_MAX_BITRATE_BPS, help = "Maximum bitrate (bps).")]
    max_bitrate: u64,

    #[arg(short = 'q', long, default_value_t = DEFAULT_MAX_QUALITY_DIFFERENCE, help = "Maximum quality difference.")]
    max_quality_difference: f64,

    #[arg(short, long = "output-path", default_value = DEFAULT_OUTPUT_PATH, help = "Output file path.")]
    output: PathBuf,

    #[arg(short, long, default_value = DEFAULT_CODEC, help = "ffmpeg audio encoder.")]
    codec: String,

    #[arg(long, default_value = DEFAULT_WORK_DIR, help = "Working directory for trial encodes.")]
    work_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS, help = "Search iteration cap (0 = unlimited).")]
    max_iterations: u32,

    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_request(self, show_progress: bool) -> ConversionRequest {
        ConversionRequest::new(self.input)
            .with_max_bitrate(self.max_bitrate)
            .with_max_quality_difference(self.max_quality_difference)
            .with_output_path(self.output)
            .with_codec(&self.codec)
            .with_work_dir(self.work_dir)
            .with_max_iterations(Some(self.max_iterations))
            .with_progress(show_progress)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let _ = init_logging("oar", LogConfig::default().with_level(level));

    let request = cli.into_request(Term::stderr().is_term());
    info!(
        input = %request.input_path.display(),
        output = %request.output_path.display(),
        codec = %request.codec,
        "oar starting"
    );

    let output = convert(&request)
        .with_context(|| format!("Failed to convert '{}'", request.input_path.display()))?;

    print_summary(&output);
    println!("{}", style("Done!").green().bold());
    Ok(())
}

fn print_summary(output: &ConversionOutput) {
    println!("📁 Input:   {}", style(output.input_path.display()).cyan());
    println!(
        "📊 Bitrate: {} → {}",
        format_kbps(output.input_bitrate_bps),
        style(format_kbps(output.bitrate_bps)).green()
    );
    println!(
        "🎚️  Quality: {} ({} iterations, {} encodes)",
        style(output.quality).cyan().bold(),
        output.iterations,
        output.encodes
    );
    println!("💾 Output:  {}", style(output.output_path.display()).cyan());
}
