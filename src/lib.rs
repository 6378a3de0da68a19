pub mod cli;
pub mod codec;
pub mod config;
pub mod convert;
pub mod feedback;
pub mod format;
pub mod image;
pub mod router;

pub use convert::run;
