//! refmonster: expands an art reference query into search terms, finds images
//! for each term through a web-search-capable model, and lays them out as a
//! collage.

pub mod collage;
pub mod config;
pub mod gateway;
pub mod orchestrator;
pub mod search;
pub mod server;
