//! # img2ico
//!
//! Convert a JPG or PNG image into a single-frame Windows ICO file, resized to an
//! exact size and optionally given rounded, transparent corners.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use img2ico::{convert, ConversionRequest};
//!
//! fn main() -> Result<(), img2ico::ConvertError> {
//!     let request = ConversionRequest::builder("photo.jpg")
//!         .size(128, 128)
//!         .corner_radius(20)
//!         .output_dir("/tmp/out")
//!         .build()?;
//!
//!     let outcome = convert(&request)?;
//!     println!("Wrote {}", outcome.output_path.display()); // /tmp/out/photo.ico
//!     Ok(())
//! }
//! ```
//!
//! ## Conversion steps
//!
//! | Step | Behavior |
//! |------|----------|
//! | Decode | Format sniffed from file contents; failures are [`ConvertError::Decode`] |
//! | Resize | Lanczos3, stretched to exactly the requested size; same-size input is copied |
//! | Round corners | Binary rounded-rectangle mask combined into alpha (radius 0 = untouched) |
//! | Encode | One 32-bit PNG frame in an ICO container, up to 512x512 |
//! | Write | Temp file + rename inside the output directory; failures are [`ConvertError::Io`] |
//!
//! ## Modules
//!
//! - [`convert`](mod@convert) — the [`IconConverter`] and its steps
//! - [`request`] — validated [`ConversionRequest`] and its builder
//! - [`mask`] — rounded-rectangle alpha masks
//! - [`ico`] — ICO container writing and inspection
//! - [`config`] — default form values loaded from JSON
//! - [`error`] — the [`ConvertError`] type

pub mod config;
pub mod convert;
pub mod error;
pub mod ico;
pub mod mask;
pub mod request;

pub use convert::{ConversionOutcome, IconConverter, convert};
pub use error::ConvertError;
pub use request::{AlphaMode, ConversionRequest};
