//! Adjusts the search depth between moves from the measured thinking time

use std::time::Duration;

use log::debug;

use crate::{Error, Result, HEIGHT, WIDTH};

#[derive(Clone, Debug, PartialEq)]
pub struct DepthConfig {
    pub min_depth: u32,
    pub max_depth: u32,
    pub default_depth: u32,
    /// thinking time per move the controller aims for
    pub target_seconds: f64,
    /// relative width of the band around the target in which depth is kept
    pub tolerance: f64,
}

impl Default for DepthConfig {
    fn default() -> Self {
        Self {
            min_depth: 4,
            max_depth: 12,
            default_depth: 8,
            target_seconds: 2.0,
            tolerance: 0.25,
        }
    }
}

impl DepthConfig {
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(Error::InvalidConfig(reason));
        if self.min_depth < 1 {
            return invalid("minimum depth must be at least 1".into());
        }
        if self.min_depth > self.max_depth {
            return invalid(format!(
                "minimum depth {} exceeds maximum depth {}",
                self.min_depth, self.max_depth
            ));
        }
        if self.default_depth < self.min_depth || self.default_depth > self.max_depth {
            return invalid(format!(
                "default depth {} outside {}..={}",
                self.default_depth, self.min_depth, self.max_depth
            ));
        }
        if self.max_depth as usize > WIDTH * HEIGHT {
            return invalid(format!("maximum depth {} exceeds board size", self.max_depth));
        }
        if !(self.target_seconds.is_finite() && self.target_seconds > 0.0) {
            return invalid("target thinking time must be positive".into());
        }
        if !(0.0..1.0).contains(&self.tolerance) {
            return invalid(format!("tolerance {} outside [0, 1)", self.tolerance));
        }
        Ok(())
    }

    pub fn lower_bound(&self) -> f64 {
        self.target_seconds * (1.0 - self.tolerance)
    }

    pub fn upper_bound(&self) -> f64 {
        self.target_seconds * (1.0 + self.tolerance)
    }
}

/// Depth to use for the next search after one at `current` took `elapsed_seconds`
///
/// Far below the band (under half its lower edge) the depth grows by two,
/// below it by one, above it shrinks by one. The result is clamped to the
/// configured range.
pub fn next_depth(current: u32, elapsed_seconds: f64, config: &DepthConfig) -> u32 {
    let lower = config.lower_bound();
    let next = if elapsed_seconds < lower / 2.0 {
        current + 2
    } else if elapsed_seconds < lower {
        current + 1
    } else if elapsed_seconds > config.upper_bound() {
        current.saturating_sub(1)
    } else {
        current
    };
    next.clamp(config.min_depth, config.max_depth)
}

/// The search depth of one running match
#[derive(Clone, Debug)]
pub struct DepthController {
    config: DepthConfig,
    depth: u32,
}

impl DepthController {
    pub fn new(config: DepthConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            depth: config.default_depth,
            config,
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn config(&self) -> &DepthConfig {
        &self.config
    }

    /// Feeds the duration of the last search, returning the depth for the next one
    pub fn observe(&mut self, elapsed: Duration) -> u32 {
        let next = next_depth(self.depth, elapsed.as_secs_f64(), &self.config);
        if next != self.depth {
            debug!(
                "search took {:.3}s, depth {} -> {}",
                elapsed.as_secs_f64(),
                self.depth,
                next
            );
        }
        self.depth = next;
        next
    }

    pub fn reset(&mut self) {
        self.depth = self.config.default_depth;
    }
}

impl Default for DepthController {
    fn default() -> Self {
        let config = DepthConfig::default();
        Self {
            depth: config.default_depth,
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_bands() {
        let config = DepthConfig::default();
        // lower edge of the band is 1.5s, upper edge 2.5s
        assert_eq!(next_depth(8, 0.5, &config), 10);
        assert_eq!(next_depth(8, 1.0, &config), 9);
        assert_eq!(next_depth(8, 1.5, &config), 8);
        assert_eq!(next_depth(8, 2.0, &config), 8);
        assert_eq!(next_depth(8, 2.5, &config), 8);
        assert_eq!(next_depth(8, 3.0, &config), 7);
    }

    #[test]
    fn clamped_to_range() {
        let config = DepthConfig::default();
        assert_eq!(next_depth(12, 0.0, &config), 12);
        assert_eq!(next_depth(11, 0.0, &config), 12);
        assert_eq!(next_depth(4, 100.0, &config), 4);
        assert_eq!(next_depth(1, 2.0, &config), 4);
    }

    #[test]
    fn fast_searches_increase_depth_until_max() -> Result<()> {
        let mut controller = DepthController::new(DepthConfig::default())?;
        let mut last = controller.depth();
        loop {
            let next = controller.observe(Duration::from_millis(1200));
            if next == last {
                break;
            }
            assert!(next > last);
            last = next;
        }
        assert_eq!(last, 12);
        assert_eq!(controller.observe(Duration::from_millis(10)), 12);

        controller.reset();
        assert_eq!(controller.depth(), 8);
        Ok(())
    }

    #[test]
    fn slow_searches_decrease_depth() -> Result<()> {
        let mut controller = DepthController::new(DepthConfig::default())?;
        for expected in (4..8).rev() {
            assert_eq!(controller.observe(Duration::from_secs(5)), expected);
        }
        assert_eq!(controller.observe(Duration::from_secs(5)), 4);
        Ok(())
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let configs = vec![
            DepthConfig {
                min_depth: 0,
                ..DepthConfig::default()
            },
            DepthConfig {
                min_depth: 10,
                max_depth: 6,
                ..DepthConfig::default()
            },
            DepthConfig {
                default_depth: 20,
                ..DepthConfig::default()
            },
            DepthConfig {
                max_depth: 43,
                ..DepthConfig::default()
            },
            DepthConfig {
                target_seconds: 0.0,
                ..DepthConfig::default()
            },
            DepthConfig {
                tolerance: 1.0,
                ..DepthConfig::default()
            },
        ];
        for config in configs {
            assert!(
                matches!(DepthController::new(config.clone()), Err(Error::InvalidConfig(_))),
                "{:?}",
                config
            );
        }
    }
}
