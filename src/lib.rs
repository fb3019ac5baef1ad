pub mod app;
pub mod cli;
pub mod config;
pub mod decode;
pub mod model;
pub mod render;
pub mod session;
pub mod stats;
pub mod util;
