#![forbid(unsafe_code)]

pub mod http;
pub mod repository;

pub use http::HttpBackend;
pub use repository::{
    AttemptRepository, Backend, CatalogLevel, CatalogRepository, InMemoryBackend, RemoteError,
};
