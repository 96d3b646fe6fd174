//! Time-axis label formatting.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

/// Which clock the label is rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelZone {
    /// The host's local timezone (what a browser's `toLocaleTimeString` shows).
    #[default]
    Local,
    Utc,
}

/// How sample timestamps become x-axis labels.
///
/// `pattern` is a chrono strftime pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFormat {
    pub pattern: String,
    pub zone: LabelZone,
}

impl Default for LabelFormat {
    fn default() -> Self {
        Self {
            pattern: "%H:%M:%S".to_string(),
            zone: LabelZone::Local,
        }
    }
}

impl LabelFormat {
    pub fn new(pattern: impl Into<String>, zone: LabelZone) -> Self {
        Self {
            pattern: pattern.into(),
            zone,
        }
    }

    /// UTC labels with the given pattern.
    pub fn utc(pattern: impl Into<String>) -> Self {
        Self::new(pattern, LabelZone::Utc)
    }

    /// Rejects patterns chrono cannot render (formatting them would panic).
    pub fn validate(&self) -> Result<(), String> {
        if StrftimeItems::new(&self.pattern).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid label pattern `{}`", self.pattern));
        }
        Ok(())
    }

    pub fn format(&self, timestamp: &DateTime<Utc>) -> String {
        match self.zone {
            LabelZone::Utc => timestamp.format(&self.pattern).to_string(),
            LabelZone::Local => timestamp
                .with_timezone(&Local)
                .format(&self.pattern)
                .to_string(),
        }
    }
}
