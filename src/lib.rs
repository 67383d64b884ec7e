//! Upload middleware that derives image variants from uploaded files
//!
//! After an upload step stores a file, a declarative task list produces
//! resized, cover and thumbnail images next to it and records their paths on
//! the file's attachment record.

pub mod app;
pub mod error;
pub mod image;
pub mod middleware;
pub mod models;
pub mod naming;
pub mod resizer;
pub mod upload;

pub use error::{Error, Result};
pub use resizer::Resizer;
