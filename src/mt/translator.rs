//! Machine translation trait and utilities
//!
//! The block pipeline talks to translation backends only through
//! `MachineTranslator`, so the HTTP provider and the mock used in tests are
//! interchangeable.
//!
//! # Example
//!
//! ```ignore
//! use patch_translator::mt::{HttpTranslator, MachineTranslator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = HttpTranslator::new("http://127.0.0.1:3000/api/translate", 30)?;
//!     let result = provider.translate("今日は", "ja", "en").await?;
//!     println!("{}", result);
//!     Ok(())
//! }
//! ```

use crate::mt::error::{MtError, MtResult};
use async_trait::async_trait;

/// Generic trait for machine translation providers
///
/// One call translates one free-text span. Implementations must map a
/// service outage to `MtError::ServiceUnavailable` so callers can stop the
/// run instead of producing thousands of untranslated units.
#[async_trait]
pub trait MachineTranslator: Send + Sync {
    /// Translate a single text string from source to target language
    ///
    /// # Arguments
    ///
    /// * `text` - The text to translate
    /// * `source_locale` - Source language code (e.g., "ja")
    /// * `target_locale` - Target language code (e.g., "en")
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The translated text, possibly empty
    /// * `Err(MtError)` - If translation fails
    async fn translate(
        &self,
        text: &str,
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<String>;

    /// Get the name of this translation provider
    ///
    /// Used for logging to identify which provider handled a run.
    fn provider_name(&self) -> &str;
}

/// Validate that a locale code is in acceptable format
///
/// Checks that the locale code contains only alphanumeric characters,
/// hyphens, and underscores.
pub fn validate_locale(locale: &str) -> MtResult<()> {
    if locale.is_empty() {
        return Err(MtError::InvalidLocale("Locale code is empty".to_string()));
    }

    if !locale
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(MtError::InvalidLocale(format!(
            "Invalid characters in locale code: {}",
            locale
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_locale_valid_codes() {
        assert!(validate_locale("ja").is_ok());
        assert!(validate_locale("en-US").is_ok());
        assert!(validate_locale("zh_Hans").is_ok());
    }

    #[test]
    fn test_validate_locale_invalid_codes() {
        assert!(validate_locale("").is_err());
        assert!(validate_locale("en@invalid").is_err());
        assert!(validate_locale("ja jp").is_err());
    }

    #[test]
    fn test_validate_locale_error_messages() {
        match validate_locale("en@US") {
            Err(MtError::InvalidLocale(msg)) => {
                assert!(msg.contains("Invalid characters"));
            }
            _ => panic!("Expected InvalidLocale error"),
        }
    }
}
