//! Waste-sorting bot library: LINE webhook gateway, LINE client, image fetcher,
//! vision classifier and reply formatting, shared by the CLI.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod image;
pub mod llm;
pub mod pipeline;
pub mod verdict;
