//! Darklabel: a lazy extractor for YOLO-family annotation layouts.
//!
//! Darklabel turns an on-disk dataset in any of the YOLO dialects (the
//! legacy Darknet layout plus the detection, segmentation, oriented-box,
//! pose, and classification directory layouts) into an in-memory model of
//! subsets, items, and typed annotations. Opening a dataset reads only the
//! manifest, the label vocabulary, and the per-subset item lists; each
//! item's annotation file (and, when records demand it, the image header)
//! is read on first access. Failures in individual items or records are
//! routed through a pluggable error policy instead of failing the whole
//! dataset.
//!
//! # Modules
//!
//! - [`model`]: The extracted data model (items, annotations, categories)
//! - [`policy`]: Error policies deciding drop versus abort
//! - [`meta`]: Side-car metadata files (`dataset_meta.json`, `images.meta`)
//! - [`error`]: Error types for extraction
//!
//! # Example
//!
//! ```no_run
//! use darklabel::{Extractor, Flavor};
//!
//! # fn main() -> Result<(), darklabel::ImportError> {
//! let mut dataset = Extractor::open("data/data.yaml", Flavor::Detection)?;
//! let mut items = dataset.cursor();
//! while let Some(item) = items.next()? {
//!     println!("{}/{}: {} annotation(s)", item.subset, item.id, item.annotations.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod meta;
pub mod model;
pub mod policy;

mod extractor;
mod format;
mod geometry;

pub use error::{AnnotationError, ImportError};
pub use extractor::{Cursor, Extractor, ExtractorOptions, Subset};
pub use format::Flavor;
