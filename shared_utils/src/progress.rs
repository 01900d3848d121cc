//! Terminal spinner shown while the search runs.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

pub const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

pub const SPINNER_TEMPLATE: &str =
    "{spinner:.green} {prefix:.cyan.bold} • ⏱️ {elapsed_precise} • {msg}";

/// A ticking spinner, or a hidden one when `visible` is false (tests, non-tty use).
pub fn create_spinner(prefix: &str, visible: bool) -> ProgressBar {
    let pb = ProgressBar::new_spinner();

    if !visible {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return pb;
    }

    let style = ProgressStyle::default_spinner()
        .template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars(SPINNER_CHARS);
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_spinner() {
        let pb = create_spinner("test", false);
        assert!(pb.is_hidden());
        pb.set_message("iteration 1");
        pb.finish_and_clear();
    }
}
