#[cfg(feature = "network")]
mod client;
mod retry;

#[cfg(feature = "network")]
pub use client::HttpClient;
pub use retry::{first_success, RetryPolicy};
