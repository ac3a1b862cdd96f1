//! gradescan-extract — image preprocessing and OCR text extraction.
//!
//! Implements the `TextExtractor` trait over the Tesseract binary, with a
//! fixed preprocessing pipeline that cleans up scanned handwriting before
//! recognition.

pub mod mock;
pub mod preprocess;
pub mod tesseract;

pub use mock::MockExtractor;
pub use tesseract::TesseractExtractor;
