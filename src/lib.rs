pub mod config;
pub mod control;
pub mod image;

pub use config::StorefrontConfig;

pub const SITE_NAME: &str = "JFLKicks";
