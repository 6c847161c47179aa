//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the reorganization pipeline and
//! something it does not own: wall-clock time, the filesystem, the source of
//! randomness, and the two content collaborators (script obfuscator and style
//! minifier). Implementations live in `src/adapters/`.

pub mod clock;
pub mod entropy;
pub mod filesystem;
pub mod script;
pub mod style;

pub use clock::Clock;
pub use entropy::Entropy;
pub use filesystem::{DirEntry, FileSystem};
pub use script::{ScriptObfuscator, ScriptOptions};
pub use style::StyleMinifier;

/// Boxed error returned by every port method.
pub type PortError = Box<dyn std::error::Error + Send + Sync>;
