//! oar - Audio converter with a bitrate ceiling
//!
//! Encodes an audio file at the highest encoder quality whose output bitrate
//! stays at or under a maximum. The quality is found by repeated trial
//! encodes; see [`search`] for the strategy.
//!
//! ```rust,ignore
//! use oar::{convert, ConversionRequest};
//!
//! let request = ConversionRequest::new("song.flac")
//!     .with_max_bitrate(208_000)
//!     .with_output_path("song.ogg");
//! let output = convert(&request)?;
//! println!("quality {} at {} bps", output.quality, output.bitrate_bps);
//! ```

pub mod config;
pub mod conversion_api;
pub mod encoder;
pub mod search;


pub use config::{
    ConversionRequest, DEFAULT_CODEC, DEFAULT_MAX_BITRATE_BPS, DEFAULT_MAX_QUALITY_DIFFERENCE,
    DEFAULT_OUTPUT_PATH, MIN_INPUT_BITRATE_BPS, MIN_QUALITY_DIFFERENCE, QUALITY_HIGH, QUALITY_LOW,
};
pub use conversion_api::{check_tools, convert, convert_with, ConversionOutput};
pub use encoder::{Encoder, FfmpegEncoder};
pub use search::{
    estimate_quality, run_bracket_search, Bracket, QualityPoint, QualitySearch, SearchConfig,
    SearchOutcome, StepKind,
};

pub use shared_utils::errors::{OarError, Result};
