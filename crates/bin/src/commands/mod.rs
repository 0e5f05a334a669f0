pub mod demo;
pub mod settings;
