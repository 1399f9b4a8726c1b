//! Engine configuration
//!
//! Matching heuristics and box-merge tolerances are loaded from TOML. Every
//! field has a default, so an empty document yields the stock configuration.

use crate::error::AnchorError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub matching: MatchConfig,
    #[serde(default)]
    pub merge: MergeConfig,
    /// Viewport scale used when indexing pages
    #[serde(default = "default_render_scale")]
    pub render_scale: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matching: MatchConfig::default(),
            merge: MergeConfig::default(),
            render_scale: default_render_scale(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the TOML is malformed or
    /// the resulting values fail validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    ///
    /// ```
    /// use anchor_core::config::EngineConfig;
    ///
    /// # fn example() -> anyhow::Result<()> {
    /// let config = EngineConfig::from_str(r#"
    ///     render_scale = 2.0
    ///
    ///     [matching]
    ///     min_fuzzy_chars = 24
    /// "#)?;
    /// assert_eq!(config.matching.min_fuzzy_chars, 24);
    /// # Ok(())
    /// # }
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnchorError> {
        self.matching.validate()?;
        self.merge.validate()?;
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            return Err(AnchorError::InvalidConfig(format!(
                "render_scale must be positive, got {}",
                self.render_scale
            )));
        }
        Ok(())
    }
}

/// Text matcher heuristics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Compact needles shorter than this never use fuzzy matching
    #[serde(default = "default_min_fuzzy_chars")]
    pub min_fuzzy_chars: usize,
    /// Head/tail fragment length as a share of the needle length
    #[serde(default = "default_fragment_ratio")]
    pub fragment_ratio: f64,
    #[serde(default = "default_fragment_min")]
    pub fragment_min: usize,
    #[serde(default = "default_fragment_max")]
    pub fragment_max: usize,
    /// Longest accepted fuzzy span as a multiple of the needle length
    #[serde(default = "default_max_span_ratio")]
    pub max_span_ratio: f64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_fuzzy_chars: default_min_fuzzy_chars(),
            fragment_ratio: default_fragment_ratio(),
            fragment_min: default_fragment_min(),
            fragment_max: default_fragment_max(),
            max_span_ratio: default_max_span_ratio(),
        }
    }
}

impl MatchConfig {
    /// Fragment length for a compact needle of `needle_len` characters
    pub fn fragment_len(&self, needle_len: usize) -> usize {
        let raw = (needle_len as f64 * self.fragment_ratio).floor() as usize;
        raw.clamp(self.fragment_min, self.fragment_max)
    }

    fn validate(&self) -> Result<(), AnchorError> {
        if self.fragment_min == 0 || self.fragment_min > self.fragment_max {
            return Err(AnchorError::InvalidConfig(format!(
                "fragment bounds must satisfy 0 < min <= max, got {}..{}",
                self.fragment_min, self.fragment_max
            )));
        }
        // Head and tail must not overlap inside the shortest fuzzy needle
        if self.fragment_min * 2 > self.min_fuzzy_chars {
            return Err(AnchorError::InvalidConfig(format!(
                "min_fuzzy_chars ({}) must be at least twice fragment_min ({})",
                self.min_fuzzy_chars, self.fragment_min
            )));
        }
        if self.fragment_ratio.is_nan() || self.fragment_ratio <= 0.0 || self.fragment_ratio > 0.5 {
            return Err(AnchorError::InvalidConfig(format!(
                "fragment_ratio must be in (0, 0.5], got {}",
                self.fragment_ratio
            )));
        }
        if self.max_span_ratio.is_nan() || self.max_span_ratio < 1.0 {
            return Err(AnchorError::InvalidConfig(format!(
                "max_span_ratio must be >= 1.0, got {}",
                self.max_span_ratio
            )));
        }
        Ok(())
    }
}

/// Box merge tolerances, expressed at `reference_scale`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Most negative (overlapping) horizontal gap that still merges
    #[serde(default = "default_min_gap")]
    pub min_gap: f64,
    /// Largest horizontal gap that still merges
    #[serde(default = "default_max_gap")]
    pub max_gap: f64,
    /// Render scale the gaps were tuned for
    #[serde(default = "default_reference_scale")]
    pub reference_scale: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            min_gap: default_min_gap(),
            max_gap: default_max_gap(),
            reference_scale: default_reference_scale(),
        }
    }
}

impl MergeConfig {
    /// Gap window `(min, max)` in pixels at the given render scale
    pub fn gap_window(&self, scale: f64) -> (f64, f64) {
        let factor = scale / self.reference_scale;
        (self.min_gap * factor, self.max_gap * factor)
    }

    fn validate(&self) -> Result<(), AnchorError> {
        if self.min_gap >= self.max_gap {
            return Err(AnchorError::InvalidConfig(format!(
                "merge gap window is empty: ({}, {})",
                self.min_gap, self.max_gap
            )));
        }
        if !(self.reference_scale.is_finite() && self.reference_scale > 0.0) {
            return Err(AnchorError::InvalidConfig(format!(
                "reference_scale must be positive, got {}",
                self.reference_scale
            )));
        }
        Ok(())
    }
}

fn default_render_scale() -> f64 {
    1.5
}

fn default_min_fuzzy_chars() -> usize {
    16
}

fn default_fragment_ratio() -> f64 {
    0.3
}

fn default_fragment_min() -> usize {
    8
}

fn default_fragment_max() -> usize {
    24
}

fn default_max_span_ratio() -> f64 {
    1.4
}

fn default_min_gap() -> f64 {
    -5.0
}

fn default_max_gap() -> f64 {
    15.0
}

/// Gaps are tuned at the default indexing scale
fn default_reference_scale() -> f64 {
    default_render_scale()
}
