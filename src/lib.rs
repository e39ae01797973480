pub mod bot;
pub mod config;
pub mod feed;
pub mod fetch;
pub mod logging;
pub mod model;
pub mod storage;
pub mod stores;
pub mod supervisor;
pub mod templates;
pub mod utils;
