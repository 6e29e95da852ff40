//! Web search client

mod duckduckgo;

pub use duckduckgo::{SearchConfig, SearchResponse, SearchResult, WebSearchClient};
