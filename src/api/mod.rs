pub mod knowledge;
pub mod settings;
