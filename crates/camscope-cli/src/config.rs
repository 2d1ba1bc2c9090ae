//! Settings loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use camscope_engine::AnalysisSettings;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    /// Ranked bins to keep.
    pub top: Option<usize>,
    /// Feed used when a program never declares one.
    pub default_feed: Option<f64>,
}

/// Parse a TOML settings document; missing keys take their defaults.
pub fn parse_settings(text: &str) -> Result<AnalysisSettings> {
    toml::from_str(text).context("invalid settings file")
}

/// Load settings from an optional file, apply overrides and validate.
pub fn load_settings(path: Option<&Path>, overrides: Overrides) -> Result<AnalysisSettings> {
    let mut settings = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            parse_settings(&text).with_context(|| format!("in {}", path.display()))?
        }
        None => AnalysisSettings::default(),
    };
    apply(&mut settings, overrides);
    settings.validate()?;
    Ok(settings)
}

/// Apply command-line overrides. A `--top` below the headline count
/// narrows the headline to match.
pub fn apply(settings: &mut AnalysisSettings, overrides: Overrides) {
    if let Some(top) = overrides.top {
        settings.top_n = top;
        settings.headline_n = settings.headline_n.min(top);
    }
    if let Some(feed) = overrides.default_feed {
        settings.default_feed = feed;
    }
}

/// The default settings as a TOML document.
pub fn default_settings_toml() -> Result<String> {
    toml::to_string_pretty(&AnalysisSettings::default()).context("failed to render settings")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win() {
        let mut settings = parse_settings("top_n = 5\ndefault_feed = 800.0\n").unwrap();
        apply(
            &mut settings,
            Overrides {
                top: Some(3),
                default_feed: None,
            },
        );
        assert_eq!(settings.top_n, 3);
        assert_eq!(settings.headline_n, 3);
        assert_eq!(settings.default_feed, 800.0);
        assert_eq!(settings.intervals.len(), 21);
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = load_settings(None, Overrides::default()).unwrap();
        assert_eq!(settings, AnalysisSettings::default());
    }

    #[test]
    fn test_small_top_narrows_headline() {
        let overrides = Overrides {
            top: Some(1),
            default_feed: None,
        };
        let settings = load_settings(None, overrides).unwrap();
        assert_eq!(settings.top_n, 1);
        assert_eq!(settings.headline_n, 1);

        let zero = Overrides {
            top: Some(0),
            default_feed: None,
        };
        assert!(load_settings(None, zero).is_err());
    }

    #[test]
    fn test_headline_above_top_in_file_rejected() {
        let settings = parse_settings("top_n = 2\nheadline_n = 5\n").unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let overrides = Overrides {
            top: None,
            default_feed: Some(-5.0),
        };
        assert!(load_settings(None, overrides).is_err());
    }

    #[test]
    fn test_default_document_round_trips() {
        let text = default_settings_toml().unwrap();
        assert!(text.contains("\"inf\""));
        assert_eq!(parse_settings(&text).unwrap(), AnalysisSettings::default());
    }

    #[test]
    fn test_unknown_types_rejected() {
        assert!(parse_settings("top_n = \"many\"").is_err());
    }
}
