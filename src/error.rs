use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 批次调度错误
    #[error("批次错误: {0}")]
    Batch(#[from] BatchError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 连接浏览器失败
    #[error("无法连接到浏览器 (端口: {port}): {source}")]
    ConnectionFailed {
        port: u16,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 执行脚本失败
    #[error("执行脚本失败: {source}")]
    ScriptExecutionFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 目录不存在
    #[error("目录不存在: {path}")]
    DirectoryNotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
}

/// 批次调度错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// 已有批次在运行
    #[error("已有批次正在运行，请先停止当前批次")]
    AlreadyRunning,
}

/// 单个章节的失败原因
///
/// 除 `AdvanceSequenceFailed` 与 `Aborted` 外都只影响当前章节。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("未找到标题输入框")]
    FieldNotFound,
    #[error("标题写入失败")]
    TitleWriteFailed,
    #[error("编辑器在 {timeout_ms}ms 内未就绪")]
    EditorNotReady { timeout_ms: u64 },
    #[error("正文写入失败（所有写入方式均失败）")]
    BodyWriteFailed,
    #[error("未找到可用的发布按钮")]
    PublishControlNotFound,
    #[error("确认按钮在 {timeout_ms}ms 内未出现")]
    ConfirmNeverAppeared { timeout_ms: u64 },
    #[error("切换到下一章节失败: {0}")]
    AdvanceSequenceFailed(AdvanceFailure),
    #[error("操作员中止")]
    Aborted,
}

impl ItemError {
    /// 是否需要终止整个批次
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, ItemError::AdvanceSequenceFailed(_) | ItemError::Aborted)
    }
}

/// 切换下一章节失败的具体位置，仅用于诊断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AdvanceFailure {
    #[error("\"新建章节\"按钮未出现")]
    ControlAbsent,
    #[error("\"新建章节\"按钮存在但点击无效")]
    ControlInert,
    #[error("新章节编辑器未就绪")]
    EditorNotReady,
}

/// 页面适配层错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    /// 页面脚本执行失败
    #[error("页面脚本执行失败: {0}")]
    ScriptFailed(String),
    /// 元素已被页面重新渲染移除
    #[error("元素已失效: {0}")]
    Detached(String),
    /// 页面拒绝了操作（例如按钮被禁用）
    #[error("页面拒绝操作: {0}")]
    Rejected(String),
    /// 所有正文写入方式都失败
    #[error("所有写入方式均失败 (共尝试 {attempts} 种)")]
    AllStrategiesFailed { attempts: usize },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::ScriptExecutionFailed {
            source: Box::new(err),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Other(format!("JSON解析失败: {}", err))
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<chromiumoxide::error::CdpError> for SurfaceError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        SurfaceError::ScriptFailed(err.to_string())
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建浏览器连接错误
    pub fn browser_connection_failed(
        port: u16,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::ConnectionFailed {
            port,
            source: Box::new(source),
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
