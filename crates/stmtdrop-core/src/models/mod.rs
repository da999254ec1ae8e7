//! Data models for the upload pipeline
//!
//! Each sub-module represents one feature area; everything is re-exported here.

mod project;
mod toast;
mod upload;

pub use project::*;
pub use toast::*;
pub use upload::*;
