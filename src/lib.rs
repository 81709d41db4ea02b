pub mod assets;
pub mod config;
pub mod images;
pub mod pocketbase;
pub mod server;
