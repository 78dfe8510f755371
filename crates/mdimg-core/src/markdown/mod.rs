//! Markdown image localization: scan references, fetch remote images into a
//! sibling directory, and rewrite the document to point at the local copies.

mod convert;
mod naming;
mod rewrite;
mod scan;

pub use convert::{convert_file, image_dir_for, output_path_for, ConvertReport};
pub use naming::{dimensioned_file_name, final_file_name, find_existing, ExistingImage};
pub use rewrite::{
    rewrite_document, FailureRecord, ImageDir, RewriteEvent, RewriteOptions, RewriteResult,
    RewriteStats, Rewriter,
};
pub use scan::{scan, ImageRef};
