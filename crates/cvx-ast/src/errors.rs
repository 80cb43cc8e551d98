use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AstError {
    #[error("Unsupported source extension: {}", .0.display())]
    UnsupportedExtension(PathBuf),
}
