//! Folio Processing Library
//!
//! Derivative generation and selection for stored originals.
//!
//! Derivatives live under their own root, mirroring the directory of the
//! original they were made from, and are named `{stem}_w{width}.{ext}`. The
//! name carries all derivative metadata; [`catalog::DerivativeCatalog`] rebuilds
//! the per-original index by scanning the derivative root.

pub mod catalog;
pub mod compression;
pub mod error;
pub mod generator;
pub mod naming;
pub mod selector;

pub use catalog::DerivativeCatalog;
pub use compression::{available_encodings, encode};
pub use error::{ProcessingError, ProcessingResult};
pub use generator::DerivativeGenerator;
pub use naming::{derivative_file_name, is_raster_extension, parse_derivative_name};
pub use selector::select_best;
