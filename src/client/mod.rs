pub mod catalog;
pub mod http;
pub mod upload;

pub use catalog::{apply_min_price, CatalogClient, CatalogError};
pub use http::create_http_client;
pub use upload::{UploadClient, UploadError};
