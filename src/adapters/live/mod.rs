//! Live adapters for real external interactions.

pub mod clock;
pub mod entropy;
pub mod filesystem;
pub mod script;
pub mod style;

pub use clock::SystemClock;
pub use entropy::RngEntropy;
pub use filesystem::LiveFileSystem;
pub use script::GlobalRenamingObfuscator;
pub use style::CompactStyleMinifier;
