//! Static, engine-declared capability metadata.
//!
//! Front ends populate language pickers from here before committing to an
//! engine, so nothing in this module constructs or probes an engine.

use super::backend::EngineKind;

/// What an engine can do, independent of any instance.
#[derive(Debug, PartialEq, Eq)]
pub struct Capabilities {
    pub kind: EngineKind,
    /// Supported language identifiers, in display order.
    pub languages: &'static [&'static str],
    pub supports_multiple_languages: bool,
    pub supports_cancellation: bool,
    /// Language used when no primary language is selected.
    pub default_language: &'static str,
}

impl Capabilities {
    pub fn supports_language(&self, language: &str) -> bool {
        self.languages.contains(&language)
    }
}

static TESSERACT: Capabilities = Capabilities {
    kind: EngineKind::Tesseract,
    languages: &[
        "afr", "ara", "aze", "bel", "ben", "bul", "cat", "ces", "chi_sim", "chi_tra", "dan",
        "deu", "ell", "eng", "est", "fin", "fra", "heb", "hin", "hrv", "hun", "ind", "ita",
        "jpn", "kan", "kor", "lav", "lit", "mal", "nld", "nor", "pol", "por", "ron", "rus",
        "slk", "slv", "spa", "srp", "swe", "tam", "tel", "tha", "tur", "ukr", "vie",
    ],
    supports_multiple_languages: true,
    supports_cancellation: true,
    default_language: "eng",
};

static CUNEIFORM: Capabilities = Capabilities {
    kind: EngineKind::Cuneiform,
    languages: &[
        "eng", "ger", "fra", "rus", "swe", "spa", "ita", "ruseng", "ukr", "srp", "hrv", "pol",
        "dan", "por", "dut", "cze", "rum", "hun", "bul", "slv", "lav", "lit", "est", "tur",
    ],
    supports_multiple_languages: false,
    supports_cancellation: false,
    default_language: "eng",
};

impl EngineKind {
    /// Capability record for this engine kind.
    pub fn capabilities(&self) -> &'static Capabilities {
        match self {
            EngineKind::Tesseract => &TESSERACT,
            EngineKind::Cuneiform => &CUNEIFORM,
        }
    }
}

/// Look up capabilities by engine name.
pub fn lookup(name: &str) -> Option<&'static Capabilities> {
    EngineKind::from_str(name).map(|kind| kind.capabilities())
}

/// Capability records for every known engine.
pub fn all() -> impl Iterator<Item = &'static Capabilities> {
    EngineKind::ALL.into_iter().map(|kind| kind.capabilities())
}

/// Capability queries on a concrete engine type, without an instance.
pub trait EngineCapabilities {
    const KIND: EngineKind;

    fn available_languages() -> &'static [&'static str] {
        Self::KIND.capabilities().languages
    }

    fn supports_multiple_languages() -> bool {
        Self::KIND.capabilities().supports_multiple_languages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_matches_kind() {
        for caps in all() {
            assert_eq!(caps.kind.capabilities(), caps);
            assert!(caps.supports_language(caps.default_language));
        }
    }

    #[test]
    fn test_lookup_by_name() {
        let caps = lookup("Cuneiform").unwrap();
        assert_eq!(caps.kind, EngineKind::Cuneiform);
        assert!(!caps.supports_multiple_languages);
        assert!(lookup("gocr").is_none());
    }

    #[test]
    fn test_language_codes_are_backend_specific() {
        let tesseract = EngineKind::Tesseract.capabilities();
        let cuneiform = EngineKind::Cuneiform.capabilities();
        assert!(tesseract.supports_language("deu"));
        assert!(!tesseract.supports_language("ger"));
        assert!(cuneiform.supports_language("ger"));
        assert!(!cuneiform.supports_language("deu"));
    }
}
