use thiserror::Error;

use super::layout::LayoutConfig;
use super::seed::DEFAULT_SPREAD;
use super::similarity::DEFAULT_THRESHOLD;

/// Invalid graph configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("similarity threshold must be within [-1, 1], got {0}")]
    Threshold(f64),

    #[error("{name} must be a finite number, got {value}")]
    NotFinite { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },
}

/// Settings for a full visualization request: edge building, seeding and
/// layout.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphConfig {
    /// Minimum cosine similarity for an edge (default 0.75, exclusive).
    pub threshold: f64,
    /// Layout engine tunables.
    pub layout: LayoutConfig,
    /// Seed for initial positions; `None` draws fresh entropy per request.
    pub seed: Option<u64>,
    /// Width of the square nodes are scattered in before layout (default 50).
    pub spread: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            layout: LayoutConfig::default(),
            seed: None,
            spread: DEFAULT_SPREAD,
        }
    }
}

impl GraphConfig {
    /// Parses configuration from environment variables.
    ///
    /// Falls back to defaults when env vars are not set or do not parse.
    ///
    /// # Environment Variables
    ///
    /// - `UMBRA_THRESHOLD` (f64, default 0.75): Minimum similarity for an edge
    /// - `UMBRA_LINK_DISTANCE` (f64, default 100): Link spring rest length
    /// - `UMBRA_CHARGE` (f64, default -300): Many-body strength
    /// - `UMBRA_COLLISION_RADIUS` (f64, default 30): Node glyph radius
    /// - `UMBRA_TICKS` (usize, default 300): Simulation steps
    /// - `UMBRA_SEED` (u64, unset by default): Seed for initial positions
    ///
    /// # Examples
    ///
    /// ```
    /// use umbra::graph::GraphConfig;
    ///
    /// let config = GraphConfig::from_env();
    /// assert_eq!(config.threshold, 0.75); // default when env var not set
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let layout = LayoutConfig {
            link_distance: env_or("UMBRA_LINK_DISTANCE", defaults.layout.link_distance),
            charge_strength: env_or("UMBRA_CHARGE", defaults.layout.charge_strength),
            collision_radius: env_or("UMBRA_COLLISION_RADIUS", defaults.layout.collision_radius),
            ticks: env_or("UMBRA_TICKS", defaults.layout.ticks),
            ..defaults.layout
        };

        Self {
            threshold: env_or("UMBRA_THRESHOLD", defaults.threshold),
            layout,
            seed: std::env::var("UMBRA_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
            spread: defaults.spread,
        }
    }

    /// Checks that every numeric setting is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layout = &self.layout;
        let finite = [
            ("threshold", self.threshold),
            ("link distance", layout.link_distance),
            ("charge strength", layout.charge_strength),
            ("collision radius", layout.collision_radius),
            ("collision strength", layout.collision_strength),
            ("center x", layout.center.x),
            ("center y", layout.center.y),
            ("alpha decay", layout.alpha_decay),
            ("alpha target", layout.alpha_target),
            ("velocity decay", layout.velocity_decay),
            ("spread", self.spread),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name, value });
            }
        }

        if !(-1.0..=1.0).contains(&self.threshold) {
            return Err(ConfigError::Threshold(self.threshold));
        }

        let non_negative = [
            ("link distance", layout.link_distance),
            ("collision radius", layout.collision_radius),
            ("spread", self.spread),
        ];
        for (name, value) in non_negative {
            if value < 0.0 {
                return Err(ConfigError::Negative { name, value });
            }
        }

        Ok(())
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}
