pub mod config;
pub mod logging;

pub mod control;
pub mod downloader;
pub mod markdown;
pub mod path_safety;
pub mod probe;
pub mod retry;
pub mod storage;
pub mod url_model;
