//! Conversion request and fixed tool constants.

use std::path::{Path, PathBuf};

use shared_utils::path_validator::{is_same_path, is_within};
use shared_utils::{OarError, Result, DEFAULT_MAX_ITERATIONS, DEFAULT_WORK_DIR};

pub const DEFAULT_MAX_BITRATE_BPS: u64 = 208_000;

pub const DEFAULT_MAX_QUALITY_DIFFERENCE: f64 = 0.000001;

pub const DEFAULT_OUTPUT_PATH: &str = "output.ogg";

pub const DEFAULT_CODEC: &str = "libvorbis";

/// Inputs at or below this bitrate are rejected.
pub const MIN_INPUT_BITRATE_BPS: f64 = 192_000.0;

/// Lower end of the `-q:a` scan range.
pub const QUALITY_LOW: f64 = 1.0;

/// Upper end of the `-q:a` scan range.
pub const QUALITY_HIGH: f64 = 10.0;

/// Narrowest accepted tolerance. Below this, quality values near
/// [`QUALITY_HIGH`] cannot be told apart in an `f64` and the bracket stops shrinking.
pub const MIN_QUALITY_DIFFERENCE: f64 = QUALITY_HIGH * f64::EPSILON * 16.0;

const DEFAULT_ARTIFACT_EXTENSION: &str = "ogg";

/// One conversion, fixed once parsed. Passed by reference everywhere.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub input_path: PathBuf,
    /// Upper bound for the output bitrate, bits per second
    pub max_bitrate_bps: u64,
    /// Search stops once the quality bracket is at most this wide
    pub max_quality_difference: f64,
    pub output_path: PathBuf,
    /// ffmpeg audio encoder name
    pub codec: String,
    /// Hidden staging directory, removed after the run
    pub work_dir: PathBuf,
    /// `None` or `Some(0)` means no cap
    pub max_iterations: Option<u32>,
    pub show_progress: bool,
}

impl ConversionRequest {
    pub fn new(input_path: impl AsRef<Path>) -> Self {
        Self {
            input_path: input_path.as_ref().to_path_buf(),
            max_bitrate_bps: DEFAULT_MAX_BITRATE_BPS,
            max_quality_difference: DEFAULT_MAX_QUALITY_DIFFERENCE,
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            codec: DEFAULT_CODEC.to_string(),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            max_iterations: Some(DEFAULT_MAX_ITERATIONS),
            show_progress: false,
        }
    }

    pub fn with_max_bitrate(mut self, bps: u64) -> Self {
        self.max_bitrate_bps = bps;
        self
    }

    pub fn with_max_quality_difference(mut self, delta: f64) -> Self {
        self.max_quality_difference = delta;
        self
    }

    pub fn with_output_path(mut self, path: impl AsRef<Path>) -> Self {
        self.output_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_codec(mut self, codec: &str) -> Self {
        self.codec = codec.to_string();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_max_iterations(mut self, max: Option<u32>) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Container extension of the staged artifact, taken from the output path.
    pub fn artifact_extension(&self) -> &str {
        self.output_path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_ARTIFACT_EXTENSION)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_bitrate_bps == 0 {
            return Err(OarError::InvalidRequest(
                "maximum bitrate must be greater than 0".to_string(),
            ));
        }
        if !self.max_quality_difference.is_finite()
            || self.max_quality_difference < MIN_QUALITY_DIFFERENCE
        {
            return Err(OarError::InvalidRequest(format!(
                "maximum quality difference must be at least {:e}, got {}",
                MIN_QUALITY_DIFFERENCE, self.max_quality_difference
            )));
        }
        if self.codec.trim().is_empty() {
            return Err(OarError::InvalidRequest("codec must not be empty".to_string()));
        }
        if !self.input_path.is_file() {
            return Err(OarError::InvalidRequest(format!(
                "input file does not exist: {}",
                self.input_path.display()
            )));
        }
        if is_same_path(&self.output_path, &self.input_path) {
            return Err(OarError::InvalidRequest(
                "output path must differ from the input path".to_string(),
            ));
        }
        if self.work_dir.as_os_str().is_empty() {
            return Err(OarError::InvalidRequest(
                "working directory must not be empty".to_string(),
            ));
        }
        // The working directory is deleted after the run.
        for (role, path) in [("input", &self.input_path), ("output", &self.output_path)] {
            if is_within(path, &self.work_dir) {
                return Err(OarError::InvalidRequest(format!(
                    "{} path '{}' lies inside the working directory '{}'",
                    role,
                    path.display(),
                    self.work_dir.display()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_for_existing_input(dir: &TempDir) -> ConversionRequest {
        let input = dir.path().join("in.flac");
        std::fs::write(&input, b"flac").unwrap();
        ConversionRequest::new(input)
    }

    #[test]
    fn test_defaults() {
        let request = ConversionRequest::new("in.flac");
        assert_eq!(request.max_bitrate_bps, 208_000);
        assert_eq!(request.max_quality_difference, 0.000001);
        assert_eq!(request.output_path, PathBuf::from("output.ogg"));
        assert_eq!(request.codec, "libvorbis");
        assert_eq!(request.work_dir, PathBuf::from(".oar_tmp"));
        assert_eq!(request.max_iterations, Some(100));
        assert_eq!(request.artifact_extension(), "ogg");
    }

    #[test]
    fn test_artifact_extension_follows_output() {
        let request = ConversionRequest::new("in.flac").with_output_path("out.oga");
        assert_eq!(request.artifact_extension(), "oga");

        let request = ConversionRequest::new("in.flac").with_output_path("noext");
        assert_eq!(request.artifact_extension(), "ogg");
    }

    #[test]
    fn test_validate_accepts_defaults() {
        let dir = TempDir::new().unwrap();
        assert!(request_for_existing_input(&dir).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = TempDir::new().unwrap();
        let base = request_for_existing_input(&dir);

        let cases = vec![
            base.clone().with_max_bitrate(0),
            base.clone().with_max_quality_difference(0.0),
            base.clone().with_max_quality_difference(-1e-6),
            base.clone().with_max_quality_difference(f64::NAN),
            base.clone().with_codec("  "),
            base.clone().with_output_path(base.input_path.clone()),
            base.clone().with_max_quality_difference(1e-300),
            base.clone().with_max_quality_difference(f64::INFINITY),
            base.clone().with_work_dir(""),
            ConversionRequest::new(dir.path().join("missing.flac")),
        ];

        for request in cases {
            assert!(
                matches!(request.validate(), Err(OarError::InvalidRequest(_))),
                "{:?} should be rejected",
                request
            );
        }
    }

    #[test]
    fn test_validate_tolerance_floor() {
        let dir = TempDir::new().unwrap();
        let base = request_for_existing_input(&dir);

        assert!(base
            .clone()
            .with_max_quality_difference(MIN_QUALITY_DIFFERENCE)
            .validate()
            .is_ok());
        assert!(base
            .clone()
            .with_max_quality_difference(1e-12)
            .validate()
            .is_ok());
        assert!(base
            .with_max_quality_difference(MIN_QUALITY_DIFFERENCE / 2.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_output_spelled_differently_from_input() {
        let dir = TempDir::new().unwrap();
        let base = request_for_existing_input(&dir);
        let respelled = dir.path().join(".").join("sub").join("..").join("in.flac");

        let request = base.with_output_path(respelled);
        assert!(matches!(
            request.validate(),
            Err(OarError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_validate_paths_inside_work_dir() {
        let dir = TempDir::new().unwrap();
        let base = request_for_existing_input(&dir).with_work_dir(dir.path().join(".oar_tmp"));

        let inside = base
            .clone()
            .with_output_path(dir.path().join(".oar_tmp").join("out.ogg"));
        assert!(matches!(inside.validate(), Err(OarError::InvalidRequest(_))));

        // Work dir is the folder holding the input.
        let around_input = base.clone().with_work_dir(dir.path());
        assert!(matches!(
            around_input.validate(),
            Err(OarError::InvalidRequest(_))
        ));

        let beside = base.with_output_path(dir.path().join("out.ogg"));
        assert!(beside.validate().is_ok());
    }
}
