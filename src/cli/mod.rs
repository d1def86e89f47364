mod ask;
mod generate;
mod root;
mod targets;

pub use root::Cli;
