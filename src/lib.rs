pub mod cli;
pub mod config;
pub mod git;
pub mod history;
pub mod infrastructure;
pub mod ui;
pub mod workspace;
