pub mod library;
pub mod menu_locator;
pub mod peaks;
pub mod preprocessing;
pub mod row_splitter;
pub mod segmenter;
pub mod template_matcher;

pub use library::ReferenceLibrary;
pub use menu_locator::MenuLocator;
pub use row_splitter::{RowSplitter, RowTemplates};
pub use segmenter::{Portrait, PortraitSegmenter};
pub use template_matcher::{PortraitMatch, PortraitMatcher};
