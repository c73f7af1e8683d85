// VL01 Suntech - Translation core
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the translator

use chrono::Duration;

/// Translator-level configuration
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Alarms older than `now - staleness_window` are considered replayed
    /// from device memory (default: 2 minutes)
    pub staleness_window: Duration,

    /// Drop stale alarms instead of only logging them (default: false)
    pub drop_stale_alarms: bool,

    /// Software label in MNT packets when no protocol is cached
    pub presence_label: String,

    /// Suffix appended to the MNT software version
    pub translator_tag: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            staleness_window: Duration::minutes(2),
            drop_stale_alarms: false,
            presence_label: "Poliglot".to_string(),
            translator_tag: "_Translator_2.0".to_string(),
        }
    }
}

impl TranslatorConfig {
    /// Create a configuration with a custom staleness window
    pub fn with_staleness_window(staleness_window: Duration) -> Self {
        Self {
            staleness_window,
            ..Default::default()
        }
    }

    /// Create a configuration that drops stale alarms
    pub fn dropping_stale_alarms() -> Self {
        Self {
            drop_stale_alarms: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translator_config_default() {
        let config = TranslatorConfig::default();
        assert_eq!(config.staleness_window, Duration::seconds(120));
        assert!(!config.drop_stale_alarms);
        assert_eq!(config.presence_label, "Poliglot");
        assert_eq!(config.translator_tag, "_Translator_2.0");
    }

    #[test]
    fn test_translator_config_with_window() {
        let config = TranslatorConfig::with_staleness_window(Duration::seconds(30));
        assert_eq!(config.staleness_window, Duration::seconds(30));
        assert!(!config.drop_stale_alarms);
    }

    #[test]
    fn test_translator_config_dropping() {
        let config = TranslatorConfig::dropping_stale_alarms();
        assert!(config.drop_stale_alarms);
        assert_eq!(config.staleness_window, Duration::minutes(2));
    }
}
