//! 程序配置
//!
//! 默认值 → TOML 配置文件（`PUBLISH_CONFIG` 指定）→ 环境变量，后者覆盖前者。

use crate::error::{AppError, AppResult, ConfigError, FileError};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标URL（章节编辑页）
    pub target_url: String,
    /// 章节 txt 文件存放目录
    pub input_folder: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
    /// 失败章节清单，便于重新提交
    pub failed_list_file: String,
    /// 批次参数
    pub batch: BatchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url: String::new(),
            input_folder: "chapters".to_string(),
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            failed_list_file: "failed.txt".to_string(),
            batch: BatchConfig::default(),
        }
    }
}

/// 批次参数（每次 `start` 时传入编排器）
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// 章节之间的等待时间，给页面留出自行刷新的时间
    pub delay_between_items_ms: u64,
    /// 直接使用文件名作为标题
    pub use_item_name_as_title: bool,
    /// 按钮文字
    pub labels: ControlLabels,
    /// 各步骤的轮询与超时参数
    pub timings: StepTimings,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_between_items_ms: 2000,
            use_item_name_as_title: false,
            labels: ControlLabels::default(),
            timings: StepTimings::default(),
        }
    }
}

impl BatchConfig {
    /// 零延迟、短超时，用于测试
    pub fn immediate() -> Self {
        Self {
            delay_between_items_ms: 0,
            use_item_name_as_title: false,
            labels: ControlLabels::default(),
            timings: StepTimings {
                poll_interval_ms: 1,
                editor_ready_timeout_ms: 50,
                settle_after_fill_ms: 0,
                publish_retry_delay_ms: 0,
                confirm_timeout_ms: 50,
                next_control_timeout_ms: 50,
                next_editor_timeout_ms: 50,
            },
        }
    }

    pub fn inter_item_delay(&self) -> Duration {
        Duration::from_millis(self.delay_between_items_ms)
    }
}

/// 页面按钮文字（不区分大小写的包含匹配）
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ControlLabels {
    pub publish: String,
    pub confirm: String,
    pub create_next: String,
}

impl Default for ControlLabels {
    fn default() -> Self {
        Self {
            publish: "PUBLISH".to_string(),
            confirm: "CONFIRM".to_string(),
            create_next: "CREATE CHAPTER".to_string(),
        }
    }
}

/// 轮询与超时参数，单位毫秒
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StepTimings {
    pub poll_interval_ms: u64,
    pub editor_ready_timeout_ms: u64,
    /// 填写完标题正文后等待页面响应
    pub settle_after_fill_ms: u64,
    /// 发布按钮唯一一次重试前的等待
    pub publish_retry_delay_ms: u64,
    pub confirm_timeout_ms: u64,
    pub next_control_timeout_ms: u64,
    pub next_editor_timeout_ms: u64,
}

impl Default for StepTimings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 200,
            editor_ready_timeout_ms: 10_000,
            settle_after_fill_ms: 500,
            publish_retry_delay_ms: 1000,
            confirm_timeout_ms: 10_000,
            next_control_timeout_ms: 10_000,
            next_editor_timeout_ms: 15_000,
        }
    }
}

impl StepTimings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Config {
    /// 加载配置：可选的 TOML 文件 + 环境变量覆盖
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("PUBLISH_CONFIG") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        base.apply_env()
    }

    /// 只从环境变量读取
    pub fn from_env() -> AppResult<Self> {
        Self::default().apply_env()
    }

    /// 从 TOML 文件读取，缺失的字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| FileError::ReadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            AppError::File(FileError::TomlParseFailed { source, .. }) => {
                AppError::File(FileError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env(mut self) -> AppResult<Self> {
        if let Some(v) = env_parse("BROWSER_DEBUG_PORT")? {
            self.browser_debug_port = v;
        }
        if let Ok(v) = std::env::var("TARGET_URL") {
            self.target_url = v;
        }
        if let Ok(v) = std::env::var("INPUT_FOLDER") {
            self.input_folder = v;
        }
        if let Some(v) = env_parse("VERBOSE_LOGGING")? {
            self.verbose_logging = v;
        }
        if let Ok(v) = std::env::var("OUTPUT_LOG_FILE") {
            self.output_log_file = v;
        }
        if let Ok(v) = std::env::var("FAILED_LIST_FILE") {
            self.failed_list_file = v;
        }
        if let Some(v) = env_parse("DELAY_BETWEEN_ITEMS_MS")? {
            self.batch.delay_between_items_ms = v;
        }
        if let Some(v) = env_parse("USE_ITEM_NAME_AS_TITLE")? {
            self.batch.use_item_name_as_title = v;
        }
        Ok(self)
    }
}

/// 读取并解析环境变量，未设置时返回 `None`
fn env_parse<T: FromStr>(var_name: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            target_url = "https://example.com/novel/1/chapters/new"

            [batch]
            delay_between_items_ms = 0
            use_item_name_as_title = true

            [batch.timings]
            confirm_timeout_ms = 3000
            "#,
        )
        .unwrap();

        assert_eq!(config.target_url, "https://example.com/novel/1/chapters/new");
        assert_eq!(config.browser_debug_port, 9222);
        assert_eq!(config.batch.delay_between_items_ms, 0);
        assert!(config.batch.use_item_name_as_title);
        assert_eq!(config.batch.timings.confirm_timeout_ms, 3000);
        assert_eq!(config.batch.timings.poll_interval_ms, 200);
        assert_eq!(config.batch.labels, ControlLabels::default());
    }

    #[test]
    fn invalid_toml_is_a_file_error() {
        let err = Config::from_toml_str("batch = 3").unwrap_err();
        assert!(matches!(err, AppError::File(FileError::TomlParseFailed { .. })));
    }

    #[test]
    fn env_parse_reports_bad_values() {
        std::env::set_var("CHAPTER_PUBLISH_TEST_BAD_U64", "abc");
        let err = env_parse::<u64>("CHAPTER_PUBLISH_TEST_BAD_U64").unwrap_err();
        assert!(err.to_string().contains("CHAPTER_PUBLISH_TEST_BAD_U64"));
        std::env::remove_var("CHAPTER_PUBLISH_TEST_BAD_U64");

        assert!(env_parse::<u64>("CHAPTER_PUBLISH_TEST_UNSET").unwrap().is_none());
    }
}
