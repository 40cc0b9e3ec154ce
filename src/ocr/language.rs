//! Language slots on an engine instance.

use serde::{Deserialize, Serialize};

use super::capabilities::Capabilities;

/// State of the secondary or tertiary slot.
///
/// A rejected selection is recorded explicitly so it can be told apart from a
/// slot nobody touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "language", rename_all = "snake_case")]
pub enum SlotState {
    #[default]
    Untouched,
    Rejected,
    Set(String),
}

impl SlotState {
    pub fn language(&self) -> Option<&str> {
        match self {
            SlotState::Set(language) => Some(language),
            SlotState::Untouched | SlotState::Rejected => None,
        }
    }
}

/// Up to three concurrently active languages.
///
/// The primary slot keeps its previous value when a selection is rejected;
/// the other two slots switch to [`SlotState::Rejected`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSelection {
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    secondary: SlotState,
    #[serde(default)]
    tertiary: SlotState,
}

impl LanguageSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Selection with the given primary language, if supported.
    pub fn with_primary(caps: &Capabilities, language: Option<&str>) -> Self {
        let mut selection = Self::new();
        if let Some(language) = language {
            selection.select_primary(caps, language);
        }
        selection
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    pub fn secondary(&self) -> &SlotState {
        &self.secondary
    }

    pub fn tertiary(&self) -> &SlotState {
        &self.tertiary
    }

    pub fn select_primary(&mut self, caps: &Capabilities, language: &str) -> bool {
        if caps.supports_language(language) {
            self.primary = Some(language.to_string());
            true
        } else {
            false
        }
    }

    pub fn select_secondary(&mut self, caps: &Capabilities, language: &str) -> bool {
        Self::select_slot(&mut self.secondary, caps, language)
    }

    pub fn select_tertiary(&mut self, caps: &Capabilities, language: &str) -> bool {
        Self::select_slot(&mut self.tertiary, caps, language)
    }

    fn select_slot(slot: &mut SlotState, caps: &Capabilities, language: &str) -> bool {
        if caps.supports_language(language) {
            *slot = SlotState::Set(language.to_string());
            true
        } else {
            *slot = SlotState::Rejected;
            false
        }
    }

    /// Languages currently occupying a slot, in slot order.
    pub fn active(&self) -> Vec<&str> {
        self.primary
            .as_deref()
            .into_iter()
            .chain(self.secondary.language())
            .chain(self.tertiary.language())
            .collect()
    }

    /// Languages to recognize with: the set slots in slot order, without
    /// duplicates. The engine default is used only when no slot is set.
    pub fn resolved(&self, caps: &Capabilities) -> Vec<String> {
        let mut languages: Vec<String> = Vec::new();
        for language in self.active() {
            if !languages.iter().any(|l| l == language) {
                languages.push(language.to_string());
            }
        }
        if languages.is_empty() {
            languages.push(caps.default_language.to_string());
        }
        languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::EngineKind;

    fn tesseract() -> &'static Capabilities {
        EngineKind::Tesseract.capabilities()
    }

    #[test]
    fn test_selection_accepts_only_supported_languages() {
        let caps = tesseract();
        let mut selection = LanguageSelection::new();
        for language in caps.languages {
            assert!(selection.select_primary(caps, language));
        }
        assert!(!selection.select_primary(caps, "xx"));
        assert!(!selection.select_primary(caps, ""));
    }

    #[test]
    fn test_rejected_secondary_replaces_previous_value() {
        let caps = tesseract();
        let mut selection = LanguageSelection::new();
        assert!(selection.select_secondary(caps, "deu"));
        assert_eq!(selection.secondary(), &SlotState::Set("deu".to_string()));

        assert!(!selection.select_secondary(caps, "xx"));
        assert_eq!(selection.secondary(), &SlotState::Rejected);
        assert_ne!(selection.secondary(), &SlotState::Untouched);
    }

    #[test]
    fn test_primary_and_tertiary_fail_differently() {
        // Slot 1 keeps its value on rejection, slots 2 and 3 do not.
        let caps = tesseract();
        let mut selection = LanguageSelection::new();
        selection.select_primary(caps, "eng");
        selection.select_tertiary(caps, "fra");

        assert!(!selection.select_primary(caps, "xx"));
        assert!(!selection.select_tertiary(caps, "xx"));

        assert_eq!(selection.primary(), Some("eng"));
        assert_eq!(selection.tertiary(), &SlotState::Rejected);
    }

    #[test]
    fn test_resolved_uses_default_and_skips_duplicates() {
        let caps = tesseract();
        let mut selection = LanguageSelection::new();
        assert_eq!(selection.resolved(caps), vec!["eng"]);

        selection.select_secondary(caps, "eng");
        selection.select_tertiary(caps, "spa");
        assert_eq!(selection.resolved(caps), vec!["eng", "spa"]);
        assert_eq!(selection.active(), vec!["eng", "spa"]);
    }

    #[test]
    fn test_resolved_without_primary_uses_only_set_slots() {
        let caps = tesseract();
        let mut selection = LanguageSelection::new();
        selection.select_secondary(caps, "deu");
        assert_eq!(selection.resolved(caps), vec!["deu"]);

        let mut selection = LanguageSelection::new();
        selection.select_tertiary(caps, "fra");
        assert_eq!(selection.resolved(caps), vec!["fra"]);

        // A rejected slot does not count as a selection.
        let mut selection = LanguageSelection::new();
        selection.select_secondary(caps, "xx");
        assert_eq!(selection.resolved(caps), vec!["eng"]);
    }

    #[test]
    fn test_with_primary_ignores_unsupported_language() {
        let caps = EngineKind::Cuneiform.capabilities();
        assert_eq!(LanguageSelection::with_primary(caps, Some("deu")).primary(), None);
        assert_eq!(
            LanguageSelection::with_primary(caps, Some("ger")).primary(),
            Some("ger")
        );
    }

    #[test]
    fn test_slot_state_serialization() {
        let json = serde_json::to_string(&SlotState::Rejected).unwrap();
        assert_eq!(json, r#"{"state":"rejected"}"#);
        let json = serde_json::to_string(&SlotState::Set("eng".to_string())).unwrap();
        assert_eq!(json, r#"{"state":"set","language":"eng"}"#);
    }
}
