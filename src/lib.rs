// Library exports for sigpanel

pub mod cli;
pub mod config;
pub mod daemon;
pub mod desktop;
pub mod error;
pub mod process;
pub mod settings;
pub mod state;
