pub mod app;
pub mod catalog;
pub mod chat_stream;
pub mod config;
pub mod message;
pub mod text_wrapping;
pub mod transcript;
pub mod usage;
