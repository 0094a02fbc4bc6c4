//! HTML processing for chapter and landing pages
//!
//! - `extractor`: selector-driven element lookup and cleanup
//! - `normalizer`: canonical paragraph structure for chapter bodies

pub mod extractor;
mod normalizer;

pub use extractor::{extract_container, strip_disallowed, unescape_fragment};
pub use normalizer::ContentNormalizer;
