//! Fashion Remix Common Library
//!
//! CLIとパイプライン各段で共有される型と純粋ロジック

pub mod types;
pub mod csv;
pub mod error;
pub mod parser;
pub mod prompts;
pub mod crop;
pub mod ledger;

pub use types::{
    safe_file_stem, ApprovalEntry, ApprovalStatus, ImageResult, ImageStatus, Manifest, ManifestStatus,
    PostRecord,
};
pub use csv::{load_posts, parse_csv_line, parse_posts, posts_to_csv, save_posts};
pub use error::{Error, Result};
pub use parser::{
    extract_json_block, is_placeholder, parse_description, parse_extraction, shortcode_from_url,
};
pub use crop::{crop_to_ratio, AspectRatio, CropAnchor, CropRect};
pub use ledger::{ApprovalLedger, StatusCounts};
