mod discovery;
mod fetcher;

pub use discovery::Discovery;
pub use fetcher::{FeedSource, RemoteFeed};
