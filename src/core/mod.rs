pub mod build;
pub mod config;
pub mod extract;
pub mod http;
pub mod locator;
pub mod output;
pub mod postprocess;
pub mod retriever;
pub mod retry;
pub mod state;
