mod config;
pub use config::CatalogBackend;
pub use config::Config;
pub use config::ObjectsBackend;

mod errors;
pub use errors::{Error, Result};

mod keys;

pub mod catalog;
pub mod cdn;
pub mod http;
pub mod library;
pub mod objects;

#[cfg(test)]
pub(crate) mod testing;
