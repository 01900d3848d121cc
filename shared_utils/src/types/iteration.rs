//! IterationGuard - bounds a search loop that has no natural iteration limit.

use std::fmt;

/// Default cap for the quality search. A well-behaved encoder converges far below it.
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct IterationError {
    pub current: u32,
    pub max: u32,
    pub context: String,
}

impl fmt::Display for IterationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Iteration limit exceeded: {}/{} in {}",
            self.current, self.max, self.context
        )
    }
}

impl std::error::Error for IterationError {}

/// Counts iterations; `max == None` never trips.
#[derive(Debug, Clone)]
pub struct IterationGuard {
    current: u32,
    max: Option<u32>,
    context: String,
}

impl IterationGuard {
    pub fn new(max: u32, context: &str) -> Self {
        Self {
            current: 0,
            max: Some(max),
            context: context.to_string(),
        }
    }

    pub fn unbounded(context: &str) -> Self {
        Self {
            current: 0,
            max: None,
            context: context.to_string(),
        }
    }

    /// `0` or `None` means no limit.
    pub fn from_limit(max: Option<u32>, context: &str) -> Self {
        match max {
            Some(0) | None => Self::unbounded(context),
            Some(n) => Self::new(n, context),
        }
    }

    pub fn increment(&mut self) -> Result<u32, IterationError> {
        self.current = self.current.saturating_add(1);
        match self.max {
            Some(max) if self.current > max => Err(IterationError {
                current: self.current,
                max,
                context: self.context.clone(),
            }),
            _ => Ok(self.current),
        }
    }

    #[inline]
    pub fn current(&self) -> u32 {
        self.current
    }

    #[inline]
    pub fn max(&self) -> Option<u32> {
        self.max
    }
}
