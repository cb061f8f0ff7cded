pub mod app;
pub mod args;
pub mod discord;
pub mod errors;
pub mod render;
pub mod report;
pub mod settings;
pub mod severity;
pub mod transform;
