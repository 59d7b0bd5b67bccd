pub mod config;
pub mod launcher;
pub mod port;
pub mod process;
pub mod tools;
pub mod utils;
