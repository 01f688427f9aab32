pub mod config;
pub mod error;
pub mod homework;
pub mod logging;
pub mod model;
pub mod poller;
pub mod practicum;
pub mod telegram;
