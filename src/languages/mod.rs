//! Static language tables, one per engine

pub mod google;
pub mod microsoft;

use crate::core::errors::{Result, TranslationError};
use crate::core::models::Engine;

/// (name, code) table for an engine
pub fn languages(engine: Engine) -> &'static [(&'static str, &'static str)] {
    match engine {
        Engine::Google => google::LANGUAGES,
        Engine::Microsoft => microsoft::LANGUAGES,
    }
}

/// Check a code against the engine's table. Codes match exactly.
pub fn is_supported(engine: Engine, code: &str) -> bool {
    languages(engine).iter().any(|(_, c)| *c == code)
}

/// Code for a human-readable language name, case-insensitive
pub fn code_for(engine: Engine, name: &str) -> Option<&'static str> {
    languages(engine)
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name.trim()))
        .map(|(_, code)| *code)
}

pub fn name_for(engine: Engine, code: &str) -> Option<&'static str> {
    languages(engine)
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(name, _)| *name)
}

/// Fails with `UnsupportedLanguage` for the first code outside the table
pub fn ensure_supported(engine: Engine, codes: &[&str]) -> Result<()> {
    match codes.iter().find(|code| !is_supported(engine, code)) {
        Some(code) => Err(TranslationError::UnsupportedLanguage {
            code: code.to_string(),
            engine: engine.to_string(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tables_have_unique_codes() {
        for engine in Engine::ALL {
            let codes: HashSet<_> = languages(engine).iter().map(|(_, c)| c).collect();
            assert_eq!(codes.len(), languages(engine).len(), "{}", engine);
        }
    }

    #[test]
    fn test_engine_specific_codes() {
        assert!(is_supported(Engine::Google, "zh-CN"));
        assert!(!is_supported(Engine::Microsoft, "zh-CN"));
        assert!(is_supported(Engine::Microsoft, "zh-CHS"));
        assert!(is_supported(Engine::Google, "iw"));
        assert!(is_supported(Engine::Microsoft, "he"));
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(code_for(Engine::Google, "spanish"), Some("es"));
        assert_eq!(code_for(Engine::Microsoft, "Klingon"), Some("tlh"));
        assert_eq!(name_for(Engine::Google, "de"), Some("German"));
        assert_eq!(code_for(Engine::Google, "Elvish"), None);
    }

    #[test]
    fn test_ensure_supported_reports_first_bad_code() {
        assert!(ensure_supported(Engine::Google, &["es", "en"]).is_ok());

        let err = ensure_supported(Engine::Microsoft, &["es", "xx"]).unwrap_err();
        assert!(matches!(
            err,
            TranslationError::UnsupportedLanguage { ref code, ref engine }
                if code == "xx" && engine == "microsoft"
        ));
    }
}
