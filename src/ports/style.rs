//! Style minifier collaborator port.

use super::PortError;

/// Compacts CSS text.
///
/// Treated as an opaque pure function. Callers keep the original text when
/// this returns an error.
pub trait StyleMinifier: Send + Sync {
    /// Minifies `css`.
    ///
    /// # Errors
    ///
    /// Returns an error if the stylesheet cannot be processed.
    fn minify(&self, css: &str) -> Result<String, PortError>;
}
