mod models;
mod root;
mod run;

pub use root::Cli;
