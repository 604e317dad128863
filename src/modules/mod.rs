pub mod config;
pub mod logger;
pub mod paths;

pub use paths::get_data_dir;
