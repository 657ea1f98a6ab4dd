pub mod brief;
pub mod config;
pub mod generate;
pub mod list;
