pub mod market;
pub mod config;
pub mod errors;

pub use market::*;
pub use config::*;
pub use errors::*;
