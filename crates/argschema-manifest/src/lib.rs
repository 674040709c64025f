//! Package manifest handling for args-to-schema
//!
//! Locates the `package.json` that owns a driver module, reads the Appium metadata out of
//! it, and writes the derived schema back without disturbing the rest of the document.

pub mod errors;
pub mod manifest;
pub mod manifest_writer;

pub use errors::ManifestError;
pub use manifest::{PackageManifest, MANIFEST_FILE};
pub use manifest_writer::Indent;
