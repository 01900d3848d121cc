//! Conversion API
//!
//! One conversion end to end:
//! - Validate the request and check ffmpeg/ffprobe are installed
//! - Reject inputs whose bitrate is already at or below the floor
//! - Search the quality inside a scoped working directory
//! - Move the accepted artifact to the output path
//!
//! The working directory is gone when [`convert`] returns, whatever the outcome.

use std::path::{Path, PathBuf};

use tracing::info;

use shared_utils::{
    format_kbps, get_duration, is_ffmpeg_available, is_ffprobe_available, BitrateProbe, OarError,
    Result, Workspace,
};

use crate::config::{ConversionRequest, MIN_INPUT_BITRATE_BPS};
use crate::encoder::{Encoder, FfmpegEncoder};
use crate::search::{QualitySearch, SearchConfig};

#[derive(Debug, Clone, PartialEq)]
pub struct ConversionOutput {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_bitrate_bps: f64,
    pub duration_secs: f64,
    pub quality: f64,
    pub bitrate_bps: f64,
    /// Refinement probes after the two initial ones
    pub iterations: u32,
    pub encodes: u32,
    pub bracket_width: f64,
}

pub fn check_tools() -> Result<()> {
    if !is_ffmpeg_available() {
        return Err(OarError::ToolNotFound(
            "ffmpeg not found in PATH. Install with: brew install ffmpeg".to_string(),
        ));
    }
    if !is_ffprobe_available() {
        return Err(OarError::ToolNotFound(
            "ffprobe not found in PATH. Install with: brew install ffmpeg".to_string(),
        ));
    }
    Ok(())
}

/// Fails when the input bitrate is at or below [`MIN_INPUT_BITRATE_BPS`].
pub fn check_input_bitrate(input: &BitrateProbe) -> Result<()> {
    if input.bitrate_bps <= MIN_INPUT_BITRATE_BPS {
        return Err(OarError::InputBitrateTooLow {
            path: input.path.clone(),
            bitrate_bps: input.bitrate_bps,
            min_bps: MIN_INPUT_BITRATE_BPS,
        });
    }
    Ok(())
}

/// Converts with ffprobe for duration and ffmpeg for encoding.
pub fn convert(request: &ConversionRequest) -> Result<ConversionOutput> {
    check_tools()?;
    convert_with(
        request,
        |path| Ok(get_duration(path)?),
        |artifact| FfmpegEncoder::new(artifact, &request.codec),
    )
}

/// [`convert`] with the duration source and the encoder supplied by the caller.
pub fn convert_with<D, M, E>(
    request: &ConversionRequest,
    duration_of: D,
    make_encoder: M,
) -> Result<ConversionOutput>
where
    D: Fn(&Path) -> Result<f64>,
    M: FnOnce(PathBuf) -> E,
    E: Encoder,
{
    request.validate()?;

    // Created first so a directory left over from an interrupted run is
    // cleared even when the input is rejected.
    let workspace = Workspace::create(&request.work_dir)?;

    let duration_secs = duration_of(&request.input_path)?;
    let input = BitrateProbe::measure(&request.input_path, duration_secs)?;
    check_input_bitrate(&input)?;

    info!(
        input = %request.input_path.display(),
        duration_secs,
        input_bitrate_bps = input.bitrate_bps,
        target_bps = request.max_bitrate_bps,
        "Input bitrate {}, searching quality for at most {}",
        format_kbps(input.bitrate_bps),
        format_kbps(request.max_bitrate_bps as f64)
    );

    let mut encoder = make_encoder(workspace.artifact_path(request.artifact_extension()));
    let outcome = QualitySearch::new(
        SearchConfig::from(request),
        &mut encoder,
        &request.input_path,
        duration_secs,
    )
    .run()?;

    workspace.persist(&outcome.artifact, &request.output_path)?;

    info!(
        output = %request.output_path.display(),
        quality = outcome.quality,
        bitrate_bps = outcome.bitrate_bps,
        iterations = outcome.iterations,
        encodes = outcome.encodes,
        "Conversion complete"
    );

    Ok(ConversionOutput {
        input_path: request.input_path.clone(),
        output_path: request.output_path.clone(),
        input_bitrate_bps: input.bitrate_bps,
        duration_secs,
        quality: outcome.quality,
        bitrate_bps: outcome.bitrate_bps,
        iterations: outcome.iterations,
        encodes: outcome.encodes,
        bracket_width: outcome.bracket_width,
    })
}
