pub mod config;
pub mod error;
pub mod publish;
pub mod video;

pub use error::Error;
