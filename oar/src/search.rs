//! Quality search
//!
//! Finds the highest encoder quality whose output bitrate stays at or under a
//! target. Bitrate is treated as a monotone, unknown function of quality that
//! can only be sampled by encoding.
//!
//! ## Strategy
//!
//! 1. Probe both ends of the quality range.
//! 2. Both ends under target: take the better one, no search needed.
//!    Both ends over target: nothing can satisfy the request.
//! 3. Otherwise keep a bracket `[low, high]` whose endpoints sit on opposite
//!    sides of the target and shrink it with false-position steps: draw a
//!    line through the two measured endpoints and probe where it crosses the
//!    target. A step that fails to halve the bracket is followed by one
//!    bisection step, so a convex curve cannot pin one endpoint forever.
//! 4. Stop once the bracket is no wider than the tolerance. The endpoint on
//!    the under-target side is the answer.

use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use shared_utils::{create_spinner, format_kbps, BitrateProbe, IterationGuard, OarError, Result};

use crate::config::{ConversionRequest, QUALITY_HIGH, QUALITY_LOW};
use crate::encoder::Encoder;

/// One measurement: the bitrate an encode at `quality` produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityPoint {
    pub quality: f64,
    pub bitrate_bps: f64,
}

impl QualityPoint {
    pub fn new(quality: f64, bitrate_bps: f64) -> Self {
        Self {
            quality,
            bitrate_bps,
        }
    }
}

/// Quality where the line through `a` and `b` reaches `target_bps`.
///
/// `a` and `b` must have different bitrates.
pub fn estimate_quality(a: QualityPoint, b: QualityPoint, target_bps: f64) -> f64 {
    let slope = (b.quality - a.quality) / (b.bitrate_bps - a.bitrate_bps);
    let intercept = a.quality - slope * a.bitrate_bps;
    slope * target_bps + intercept
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// False-position estimate from the two endpoints
    Secant,
    /// Midpoint of the bracket
    Bisection,
}

/// Where the two initial probes leave the search.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchStart {
    /// Endpoints straddle the target
    Bracketed(Bracket),
    /// Both endpoints at or under the target; carries the higher-bitrate one
    AllUnder(QualityPoint),
    /// Both endpoints over the target; carries the lower-bitrate one
    AllOver(QualityPoint),
}

impl SearchStart {
    pub fn classify(low: QualityPoint, high: QualityPoint, target_bps: f64) -> Self {
        match (low.bitrate_bps > target_bps, high.bitrate_bps > target_bps) {
            (true, true) => {
                let best = if high.bitrate_bps < low.bitrate_bps { high } else { low };
                SearchStart::AllOver(best)
            }
            (false, false) => {
                let best = if low.bitrate_bps > high.bitrate_bps { low } else { high };
                SearchStart::AllUnder(best)
            }
            _ => SearchStart::Bracketed(Bracket::new(low, high, target_bps)),
        }
    }
}

/// Quality interval whose endpoints lie on opposite sides of the target.
///
/// `low.quality <= high.quality` always holds. Exactly one endpoint is over
/// the target, unless a probe hit the target exactly, in which case both
/// endpoints are that probe and the width is zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    low: QualityPoint,
    high: QualityPoint,
    target_bps: f64,
    rising: bool,
    next_step: StepKind,
}

impl Bracket {
    /// `low` and `high` must straddle `target_bps`.
    pub fn new(low: QualityPoint, high: QualityPoint, target_bps: f64) -> Self {
        let (low, high) = if low.quality <= high.quality {
            (low, high)
        } else {
            (high, low)
        };
        let mut bracket = Self {
            low,
            high,
            target_bps,
            rising: high.bitrate_bps > low.bitrate_bps,
            next_step: StepKind::Secant,
        };
        if low.bitrate_bps == target_bps {
            bracket.collapse(low);
        } else if high.bitrate_bps == target_bps {
            bracket.collapse(high);
        }
        bracket
    }

    pub fn low(&self) -> QualityPoint {
        self.low
    }

    pub fn high(&self) -> QualityPoint {
        self.high
    }

    pub fn width(&self) -> f64 {
        self.high.quality - self.low.quality
    }

    /// True when bitrate grows with quality.
    pub fn is_rising(&self) -> bool {
        self.rising
    }

    pub fn next_step(&self) -> StepKind {
        self.next_step
    }

    /// The endpoint at or under the target.
    pub fn accepted(&self) -> QualityPoint {
        if self.rising {
            self.low
        } else {
            self.high
        }
    }

    /// Quality to probe next, always inside the bracket.
    pub fn next_quality(&self) -> f64 {
        let midpoint = self.low.quality + self.width() / 2.0;
        match self.next_step {
            StepKind::Bisection => midpoint,
            StepKind::Secant => {
                let q = estimate_quality(self.low, self.high, self.target_bps);
                if q.is_finite() {
                    q.clamp(self.low.quality, self.high.quality)
                } else {
                    midpoint
                }
            }
        }
    }

    /// Replaces the endpoint on the same side of the target as `probe`.
    pub fn narrow(&mut self, probe: QualityPoint) {
        if probe.bitrate_bps == self.target_bps {
            self.collapse(probe);
            return;
        }

        let before = self.width();
        let over = probe.bitrate_bps > self.target_bps;
        // Over target on a rising curve means quality was too high.
        if over == self.rising {
            self.high = probe;
        } else {
            self.low = probe;
        }

        self.next_step = if self.width() > before / 2.0 {
            StepKind::Bisection
        } else {
            StepKind::Secant
        };
    }

    fn collapse(&mut self, point: QualityPoint) {
        self.low = point;
        self.high = point;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    pub target_bps: f64,
    pub max_quality_difference: f64,
    pub quality_low: f64,
    pub quality_high: f64,
    /// `None` or `Some(0)` means no cap
    pub max_iterations: Option<u32>,
    pub show_progress: bool,
}

impl SearchConfig {
    pub fn new(target_bps: f64, max_quality_difference: f64) -> Self {
        Self {
            target_bps,
            max_quality_difference,
            quality_low: QUALITY_LOW,
            quality_high: QUALITY_HIGH,
            max_iterations: Some(shared_utils::DEFAULT_MAX_ITERATIONS),
            show_progress: false,
        }
    }

    pub fn with_max_iterations(mut self, max: Option<u32>) -> Self {
        self.max_iterations = max;
        self
    }
}

impl From<&ConversionRequest> for SearchConfig {
    fn from(request: &ConversionRequest) -> Self {
        Self {
            target_bps: request.max_bitrate_bps as f64,
            max_quality_difference: request.max_quality_difference,
            quality_low: QUALITY_LOW,
            quality_high: QUALITY_HIGH,
            max_iterations: request.max_iterations,
            show_progress: request.show_progress,
        }
    }
}

/// Result of the pure bracketing loop.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketResult {
    pub accepted: QualityPoint,
    /// Refinement probes, not counting the two initial ones
    pub iterations: u32,
    pub bracket_width: f64,
}

/// Runs the search against any `measure(quality) -> bitrate` function.
///
/// Probes are made in order: `quality_low`, `quality_high`, then one per
/// iteration. Errors from `measure` stop the search immediately.
pub fn run_bracket_search<F>(config: &SearchConfig, mut measure: F) -> Result<BracketResult>
where
    F: FnMut(f64) -> Result<f64>,
{
    let spinner = create_spinner("Searching", config.show_progress);
    let target = config.target_bps;

    let low = QualityPoint::new(config.quality_low, measure(config.quality_low)?);
    log_probe(&spinner, low, 0, None);
    let high = QualityPoint::new(config.quality_high, measure(config.quality_high)?);
    log_probe(&spinner, high, 0, None);

    let mut bracket = match SearchStart::classify(low, high, target) {
        SearchStart::AllOver(best) => {
            spinner.finish_and_clear();
            return Err(OarError::TargetUnreachable {
                quality: best.quality,
                bitrate_bps: best.bitrate_bps,
                target_bps: target,
            });
        }
        SearchStart::AllUnder(best) => {
            spinner.finish_and_clear();
            warn!(
                quality = best.quality,
                bitrate_bps = best.bitrate_bps,
                target_bps = target,
                "Whole quality range fits under the target, using quality {}",
                best.quality
            );
            return Ok(BracketResult {
                accepted: best,
                iterations: 0,
                bracket_width: 0.0,
            });
        }
        SearchStart::Bracketed(bracket) => bracket,
    };

    debug!(
        rising = bracket.is_rising(),
        low = bracket.low().quality,
        high = bracket.high().quality,
        "Target bracketed"
    );

    let mut guard = IterationGuard::from_limit(config.max_iterations, "quality search");
    debug!(max_iterations = ?guard.max(), "Refining bracket");
    while bracket.width() > config.max_quality_difference {
        let iteration = guard.increment()?;
        let step = bracket.next_step();
        let quality = bracket.next_quality();
        let point = QualityPoint::new(quality, measure(quality)?);
        log_probe(&spinner, point, iteration, Some(step));
        bracket.narrow(point);
        spinner.set_message(format!(
            "iteration {} • width {:.2e}",
            iteration,
            bracket.width()
        ));
    }

    spinner.finish_and_clear();
    Ok(BracketResult {
        accepted: bracket.accepted(),
        iterations: guard.current(),
        bracket_width: bracket.width(),
    })
}

fn log_probe(
    spinner: &ProgressBar,
    point: QualityPoint,
    iteration: u32,
    step: Option<StepKind>,
) {
    spinner.suspend(|| {
        info!(
            iteration,
            quality = point.quality,
            bitrate_bps = point.bitrate_bps,
            step = ?step,
            "Bitrate at quality '{}': {}",
            point.quality,
            format_kbps(point.bitrate_bps)
        );
    });
}

/// Search outcome with the artifact left at the accepted quality.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub quality: f64,
    pub bitrate_bps: f64,
    pub artifact: PathBuf,
    pub iterations: u32,
    /// Total encoder runs, including the initial probes
    pub encodes: u32,
    pub bracket_width: f64,
}

/// Drives an [`Encoder`] through [`run_bracket_search`].
pub struct QualitySearch<'a, E: Encoder> {
    config: SearchConfig,
    encoder: &'a mut E,
    input: &'a Path,
    duration_secs: f64,
}

impl<'a, E: Encoder> QualitySearch<'a, E> {
    pub fn new(
        config: SearchConfig,
        encoder: &'a mut E,
        input: &'a Path,
        duration_secs: f64,
    ) -> Self {
        Self {
            config,
            encoder,
            input,
            duration_secs,
        }
    }

    pub fn run(self) -> Result<SearchOutcome> {
        let Self {
            config,
            encoder,
            input,
            duration_secs,
        } = self;

        let mut encodes = 0u32;
        let mut last: Option<(f64, PathBuf)> = None;

        let result = run_bracket_search(&config, |quality| {
            let artifact = encoder.encode(input, quality)?;
            encodes += 1;
            let probe = BitrateProbe::measure(&artifact, duration_secs)?;
            last = Some((quality, artifact));
            Ok(probe.bitrate_bps)
        })?;

        // Every encode overwrites the same artifact; the last probe may have
        // been on the over-target side.
        let (artifact, bitrate_bps) = match last {
            Some((quality, artifact)) if quality == result.accepted.quality => {
                (artifact, result.accepted.bitrate_bps)
            }
            _ => {
                debug!(
                    quality = result.accepted.quality,
                    "Re-encoding at accepted quality"
                );
                encodes += 1;
                let artifact = encoder.encode(input, result.accepted.quality)?;
                let probe = BitrateProbe::measure(&artifact, duration_secs)?;
                if probe.bitrate_bps > config.target_bps {
                    return Err(OarError::ReencodeOverTarget {
                        quality: result.accepted.quality,
                        bitrate_bps: probe.bitrate_bps,
                        target_bps: config.target_bps,
                    });
                }
                if probe.bitrate_bps != result.accepted.bitrate_bps {
                    warn!(
                        expected_bps = result.accepted.bitrate_bps,
                        actual_bps = probe.bitrate_bps,
                        "Re-encode produced a different bitrate"
                    );
                }
                (artifact, probe.bitrate_bps)
            }
        };

        Ok(SearchOutcome {
            quality: result.accepted.quality,
            bitrate_bps,
            artifact,
            iterations: result.iterations,
            encodes,
            bracket_width: result.bracket_width,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(quality: f64, bitrate_bps: f64) -> QualityPoint {
        QualityPoint::new(quality, bitrate_bps)
    }

    #[test]
    fn test_estimate_quality_on_a_line() {
        // bitrate = 10000 * q
        let q = estimate_quality(p(1.0, 10_000.0), p(10.0, 100_000.0), 55_000.0);
        assert!((q - 5.5).abs() < 1e-12);
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            SearchStart::classify(p(1.0, 300.0), p(10.0, 500.0), 200.0),
            SearchStart::AllOver(point) if point.quality == 1.0
        ));
        assert!(matches!(
            SearchStart::classify(p(1.0, 100.0), p(10.0, 150.0), 200.0),
            SearchStart::AllUnder(point) if point.quality == 10.0
        ));
        assert!(matches!(
            SearchStart::classify(p(1.0, 100.0), p(10.0, 300.0), 200.0),
            SearchStart::Bracketed(_)
        ));
    }

    #[test]
    fn test_narrow_rising() {
        let mut bracket = Bracket::new(p(1.0, 100.0), p(10.0, 300.0), 200.0);
        assert!(bracket.is_rising());
        bracket.narrow(p(6.0, 250.0));
        assert_eq!(bracket.high().quality, 6.0);
        bracket.narrow(p(3.0, 150.0));
        assert_eq!(bracket.low().quality, 3.0);
        assert_eq!(bracket.accepted().quality, 3.0);
    }

    #[test]
    fn test_narrow_falling() {
        let mut bracket = Bracket::new(p(1.0, 300.0), p(10.0, 100.0), 200.0);
        assert!(!bracket.is_rising());
        bracket.narrow(p(6.0, 250.0));
        assert_eq!(bracket.low().quality, 6.0);
        bracket.narrow(p(8.0, 150.0));
        assert_eq!(bracket.high().quality, 8.0);
        assert_eq!(bracket.accepted().quality, 8.0);
    }

    #[test]
    fn test_exact_hit_collapses() {
        let mut bracket = Bracket::new(p(1.0, 100.0), p(10.0, 300.0), 200.0);
        bracket.narrow(p(5.0, 200.0));
        assert_eq!(bracket.width(), 0.0);
        assert_eq!(bracket.accepted(), p(5.0, 200.0));

        let bracket = Bracket::new(p(1.0, 300.0), p(10.0, 200.0), 200.0);
        assert_eq!(bracket.width(), 0.0);
        assert_eq!(bracket.accepted().quality, 10.0);
    }

    #[test]
    fn test_slow_step_switches_to_bisection() {
        let mut bracket = Bracket::new(p(1.0, 100.0), p(10.0, 300.0), 200.0);
        assert_eq!(bracket.next_step(), StepKind::Secant);
        bracket.narrow(p(2.0, 120.0));
        assert_eq!(bracket.next_step(), StepKind::Bisection);
        assert_eq!(bracket.next_quality(), 6.0);
        bracket.narrow(p(6.0, 250.0));
        assert_eq!(bracket.next_step(), StepKind::Secant);
    }

    #[test]
    fn test_next_quality_stays_inside() {
        let bracket = Bracket::new(p(1.0, 100.0), p(10.0, 300.0), 200.0);
        let q = bracket.next_quality();
        assert!((1.0..=10.0).contains(&q));
        assert!((q - 5.5).abs() < 1e-12);
    }
}
