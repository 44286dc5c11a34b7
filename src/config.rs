use std::fmt::Display;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub const DEFAULT_QUESTIONS: u32 = 40;
pub const DEFAULT_OPTIONS: u32 = 4;

/// Everything needed to grade a set of sheets, loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingConfig {
    pub questions: u32,
    pub options: u32,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub rows: RowClusteringConfig,
    /// Spread the template calibration grid over the rayon thread pool.
    #[serde(default)]
    pub parallel_search: bool,
}

/// Bounds of the calibration grid and of the narrowed transfer grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchConfig {
    pub sensitivity_max: u32,
    pub sensitivity_min: u32,
    pub separation_min: u32,
    pub separation_max: u32,
    /// How many sensitivity levels below the template's a transfer may try.
    pub transfer_sensitivity_span: u32,
    /// Relative widening of the radius window used by transfers.
    pub radius_tolerance: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            sensitivity_max: 15,
            sensitivity_min: 6,
            separation_min: 5,
            separation_max: 34,
            transfer_sensitivity_span: 10,
            radius_tolerance: 0.2,
        }
    }
}

/// Neighbourhood radii (in pixels along y) for grouping bubbles into rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RowClusteringConfig {
    pub eps: f32,
    pub fallback_eps: f32,
}

impl Default for RowClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 20.0,
            fallback_eps: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NoQuestions,
    TooFewOptions(u32),
    EmptySensitivityRange,
    EmptySeparationRange,
    InvalidRadiusTolerance(f64),
    InvalidRowEps(f32),
    Unreadable(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoQuestions => write!(f, "at least one question is required"),
            ConfigError::TooFewOptions(options) => {
                write!(f, "at least two options are required, got {}", options)
            }
            ConfigError::EmptySensitivityRange => write!(f, "sensitivity range is empty"),
            ConfigError::EmptySeparationRange => write!(f, "separation range is empty"),
            ConfigError::InvalidRadiusTolerance(tolerance) => {
                write!(f, "radius tolerance must be in [0, 1), got {}", tolerance)
            }
            ConfigError::InvalidRowEps(eps) => {
                write!(f, "row clustering neighbourhood must be positive, got {}", eps)
            }
            ConfigError::Unreadable(reason) => write!(f, "unable to read config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            questions: DEFAULT_QUESTIONS,
            options: DEFAULT_OPTIONS,
            search: SearchConfig::default(),
            rows: RowClusteringConfig::default(),
            parallel_search: false,
        }
    }
}

impl GradingConfig {
    #[cfg(test)]
    pub fn new(questions: u32, options: u32) -> Self {
        Self {
            questions,
            options,
            ..Self::default()
        }
    }

    /// Reads a JSON config, filling missing fields with defaults. The result
    /// is not validated so command line overrides can still apply.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Unreadable(e.to_string()))
    }

    /// Number of bubbles every sheet must contain.
    pub fn expected_bubbles(&self) -> usize {
        self.questions as usize * self.options as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.questions < 1 {
            return Err(ConfigError::NoQuestions);
        }
        if self.options < 2 {
            return Err(ConfigError::TooFewOptions(self.options));
        }
        if self.search.sensitivity_min == 0
            || self.search.sensitivity_min > self.search.sensitivity_max
        {
            return Err(ConfigError::EmptySensitivityRange);
        }
        if self.search.separation_min == 0
            || self.search.separation_min > self.search.separation_max
        {
            return Err(ConfigError::EmptySeparationRange);
        }
        if !(0.0..1.0).contains(&self.search.radius_tolerance) {
            return Err(ConfigError::InvalidRadiusTolerance(
                self.search.radius_tolerance,
            ));
        }
        for eps in [self.rows.eps, self.rows.fallback_eps] {
            if !(eps > 0.0) {
                return Err(ConfigError::InvalidRowEps(eps));
            }
        }
        Ok(())
    }
}
