pub mod client;
pub mod http;
pub mod retry;

pub use client::Gw2Client;
pub use retry::{retry, try_once, RetryPolicy};
