pub mod agent;
pub mod config;
pub mod errors;
pub mod models;
pub mod platform;
pub mod prompt_template;
pub mod providers;
pub mod toolbox;
