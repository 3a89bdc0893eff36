//! Settings-file deserialization and runtime-limit validation.

pub mod models;
pub mod validator;

pub use models::{CacheSetting, EntrezSetting, OutputSetting, Settings, TimeoutSetting};
pub use validator::RuntimeConfig;
