//! Display preferences. They survive session resets.

use serde::{Deserialize, Serialize};

/// UI theme
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Dark => Self::Light,
            Self::Light => Self::Dark,
        }
    }
}

/// User preferences
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Preferences {
    pub theme: Theme,
    /// Whether the sidebar is collapsed
    #[serde(default)]
    pub sidebar_collapsed: bool,
}

impl Preferences {
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.sidebar_collapsed = !self.sidebar_collapsed;
        self.sidebar_collapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let prefs = Preferences::default();
        assert_eq!(prefs.theme, Theme::Dark);
        assert!(!prefs.sidebar_collapsed);
    }

    #[test]
    fn test_toggles() {
        let mut prefs = Preferences::default();
        assert_eq!(prefs.toggle_theme(), Theme::Light);
        assert_eq!(prefs.toggle_theme(), Theme::Dark);
        assert!(prefs.toggle_sidebar());
        assert!(!prefs.toggle_sidebar());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_value(Preferences::default()).unwrap();
        assert_eq!(json["theme"], "dark");
        let back: Preferences = serde_json::from_str(r#"{"theme":"light"}"#).unwrap();
        assert_eq!(back.theme, Theme::Light);
        assert!(!back.sidebar_collapsed);
    }
}
