//! Deserializable shape of the settings file, plus runtime defaults.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub entrez_setting: EntrezSetting,
    #[serde(default)]
    pub cache_setting: CacheSetting,
    #[serde(default)]
    pub output_setting: OutputSetting,
    #[serde(default)]
    pub timeout_setting: TimeoutSetting,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            entrez_setting: EntrezSetting::default(),
            cache_setting: CacheSetting::default(),
            output_setting: OutputSetting::default(),
            timeout_setting: TimeoutSetting::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EntrezSetting {
    #[serde(default = "default_db")]
    pub db: String,
    #[serde(default = "default_ret_max")]
    pub ret_max: u64,
    #[serde(default = "default_ret_mode")]
    pub ret_mode: String,
    #[serde(default = "default_use_history")]
    pub use_history: bool,
    #[serde(default = "default_search_type")]
    pub search_type: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_tool_name")]
    pub tool_name: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
}

impl Default for EntrezSetting {
    fn default() -> Self {
        Self {
            db: default_db(),
            ret_max: default_ret_max(),
            ret_mode: default_ret_mode(),
            use_history: default_use_history(),
            search_type: default_search_type(),
            email: String::new(),
            tool_name: default_tool_name(),
            api_key: String::new(),
            batch_size: default_batch_size(),
        }
    }
}

impl EntrezSetting {
    #[must_use]
    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }
}

fn default_db() -> String { "clinvar".to_string() }
const fn default_ret_max() -> u64 { 10_000 }
fn default_ret_mode() -> String { "xml".to_string() }
const fn default_use_history() -> bool { true }
fn default_search_type() -> String { "gene symbol".to_string() }
fn default_tool_name() -> String { "clinvar-dl".to_string() }
const fn default_batch_size() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSetting {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    #[serde(default = "default_cache_dir")]
    pub dir: String,
    #[serde(default = "default_ttl_secs")]
    pub ttl: u64,
    #[serde(default = "default_max_size")]
    pub max_size: u64,
}

impl Default for CacheSetting {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
            ttl: default_ttl_secs(),
            max_size: default_max_size(),
        }
    }
}

const fn default_cache_enabled() -> bool { true }
fn default_cache_dir() -> String { ".cache".to_string() }
const fn default_ttl_secs() -> u64 { 6 * 3600 }
const fn default_max_size() -> u64 { 200 * 1024 * 1024 }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputSetting {
    #[serde(default = "default_storage")]
    pub storage: String,
}

impl Default for OutputSetting {
    fn default() -> Self {
        Self { storage: default_storage() }
    }
}

fn default_storage() -> String { "output".to_string() }

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeoutSetting {
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout: u64,
    #[serde(default = "default_single_query_timeout_secs")]
    pub single_query_timeout: u64,
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout: u64,
}

impl Default for TimeoutSetting {
    fn default() -> Self {
        Self {
            query_timeout: default_query_timeout_secs(),
            single_query_timeout: default_single_query_timeout_secs(),
            write_timeout: default_write_timeout_secs(),
        }
    }
}

const fn default_query_timeout_secs() -> u64 { 30 * 60 }
const fn default_single_query_timeout_secs() -> u64 { 20 * 60 }
const fn default_write_timeout_secs() -> u64 { 10 * 60 }
