pub mod chat;
pub mod stores;
