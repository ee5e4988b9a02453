pub mod engine;
pub mod http_ocr;
pub mod parser;

// Re-export main types
pub use engine::OcrEngine;
pub use http_ocr::HttpOcrClient;
pub use parser::{ParsedText, ResultParser};
