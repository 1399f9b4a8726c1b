//! Export configuration
//!
//! Engine settings live at the top level of the TOML document (the same keys
//! `anchor_core` reads), export-only settings sit beside them.

use crate::error::ExportError;
use anchor_core::EngineConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(flatten)]
    pub engine: EngineConfig,
    /// Fill alpha of burned-in highlights
    #[serde(default = "default_highlight_opacity")]
    pub highlight_opacity: f32,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            highlight_opacity: default_highlight_opacity(),
            report: ReportConfig::default(),
        }
    }
}

impl ExportConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        self.engine.validate()?;
        if self.highlight_opacity.is_nan() || self.highlight_opacity <= 0.0 || self.highlight_opacity > 1.0 {
            return Err(ExportError::Config(format!(
                "highlight_opacity must be in (0, 1], got {}",
                self.highlight_opacity
            )));
        }
        self.report.validate()
    }
}

/// Page geometry of the generated summary report, in PDF points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    #[serde(default = "default_page_height")]
    pub page_height: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
        }
    }
}

/// Smallest usable content area on either axis
const MIN_CONTENT_EXTENT: f64 = 200.0;

impl ReportConfig {
    pub(crate) fn validate(&self) -> Result<(), ExportError> {
        if self.margin.is_nan() || self.margin < 0.0 {
            return Err(ExportError::Config(format!(
                "report margin must be non-negative, got {}",
                self.margin
            )));
        }
        let usable_width = self.page_width - 2.0 * self.margin;
        let usable_height = self.page_height - 2.0 * self.margin;
        if usable_width.is_nan()
            || usable_height.is_nan()
            || usable_width < MIN_CONTENT_EXTENT
            || usable_height < MIN_CONTENT_EXTENT
        {
            return Err(ExportError::Config(format!(
                "report page {}x{} with margin {} leaves no room for content",
                self.page_width, self.page_height, self.margin
            )));
        }
        Ok(())
    }
}

fn default_highlight_opacity() -> f32 {
    0.35
}

fn default_page_width() -> f64 {
    612.0
}

fn default_page_height() -> f64 {
    792.0
}

fn default_margin() -> f64 {
    48.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config = ExportConfig::from_str("").unwrap();
        assert_eq!(config, ExportConfig::default());
        assert_eq!(config.report.page_width, 612.0);
        assert_eq!(config.engine.render_scale, 1.5);
    }

    #[test]
    fn test_engine_keys_sit_at_top_level() {
        let config = ExportConfig::from_str(
            r#"
            render_scale = 2.0
            highlight_opacity = 0.5

            [matching]
            min_fuzzy_chars = 20

            [report]
            page_width = 595.0
            page_height = 842.0
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.render_scale, 2.0);
        assert_eq!(config.engine.matching.min_fuzzy_chars, 20);
        assert_eq!(config.highlight_opacity, 0.5);
        assert_eq!(config.report.page_height, 842.0);
        assert_eq!(config.report.margin, 48.0);
    }

    #[test]
    fn test_bad_opacity_rejected() {
        let err = ExportConfig::from_str("highlight_opacity = 1.5").unwrap_err();
        assert!(err.to_string().contains("highlight_opacity"));
    }

    #[test]
    fn test_engine_validation_is_applied() {
        let err = ExportConfig::from_str("render_scale = 0.0").unwrap_err();
        assert!(err.to_string().contains("render_scale"));
    }

    #[test]
    fn test_tiny_page_rejected() {
        let config = ExportConfig {
            report: ReportConfig {
                page_width: 200.0,
                page_height: 200.0,
                margin: 48.0,
            },
            ..ExportConfig::default()
        };
        assert!(matches!(config.validate(), Err(ExportError::Config(_))));
    }
}
