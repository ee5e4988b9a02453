pub mod config;
pub mod export;
pub mod ocr;
pub mod pipeline;
pub mod vision;
