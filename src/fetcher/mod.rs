// HTTP seam shared by every source adapter and the enrichment collaborator.

pub mod client;
pub mod retry;
pub mod traits;

pub use client::ReqwestFetcher;
pub use retry::RetryPolicy;
pub use traits::{fetch_json, HttpFetch, HttpRequest};
