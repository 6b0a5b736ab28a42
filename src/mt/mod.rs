/// Machine Translation Module
///
/// Translation providers behind the `MachineTranslator` trait and the
/// clean-up applied to every reply.
///
/// # Overview
///
/// 1. **MT Trait** - one call per free-text span, `ServiceUnavailable` marks an outage
/// 2. **HTTP Provider** - JSON POST to a local translation server
/// 3. **Mock Provider** - deterministic translator for tests and offline runs
/// 4. **Clean-up** - normalises raw service output
pub mod clean;
pub mod error;
pub mod http;
pub mod mock;
pub mod translator;

pub use clean::clean_translation;
pub use error::{MtError, MtResult};
pub use http::HttpTranslator;
pub use mock::{MockMode, MockTranslator};
pub use translator::{MachineTranslator, validate_locale};
