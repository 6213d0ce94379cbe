// CLI module for oxitag
//
// Thin front-end over the library: every command reads whole files into memory and
// hands the bytes to a `Tagger`.

pub mod commands;
pub mod config;
pub mod output;

pub use commands::run;
pub use config::Config;
