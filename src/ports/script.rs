//! Script obfuscator collaborator port.

use std::collections::BTreeMap;
use std::path::Path;

use super::PortError;

/// Inputs handed to the script obfuscator alongside the source text.
#[derive(Debug, Clone, Copy)]
pub struct ScriptOptions<'a> {
    /// Global identifier renames decided for this copy (original -> new).
    pub globals: &'a BTreeMap<String, String>,
    /// File the script came from, if it is not an inline block.
    pub source: Option<&'a Path>,
}

/// Transforms a script body into an equivalent, harder to read one.
///
/// Treated as an opaque pure function. Callers keep the original text when
/// this returns an error.
pub trait ScriptObfuscator: Send + Sync {
    /// Obfuscates `source`.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be transformed.
    fn obfuscate(&self, source: &str, options: &ScriptOptions<'_>) -> Result<String, PortError>;
}
