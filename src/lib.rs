//! # Chapter Publish
//!
//! 把一批章节文本依次发布到网页编辑器的自动化工具
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有 Page，只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `wait_until` - 带超时、可取消的条件轮询
//!
//! ### ② 页面适配层（Surface）
//! - `surface/` - 定位标题框、编辑器、按钮，写入内容、点击
//! - `PageSurface` - 真实页面；`MockSurface` - 测试替身
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个章节"的完整处理流程
//! - `ItemFlow` - 标题 → 正文 → 发布 → 确认，以及新建下一章节
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_orchestrator` - 按顺序处理整个批次
//! - `orchestrator/control` - 暂停 / 继续 / 停止 / 中止
//! - `orchestrator/batch_processor` - 应用入口，管理浏览器资源
//!
//! 进度通过 `progress/` 的 `EventSink` 输出，失败章节由 `services/` 写入文件。

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod services;
pub mod surface;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::connect_to_browser_and_page;
pub use config::{BatchConfig, Config};
pub use error::{AppError, AppResult, BatchError, ItemError};
pub use infrastructure::JsExecutor;
pub use models::{BatchState, Item, ItemOutcome};
pub use orchestrator::{App, BatchControl, BatchOrchestrator};
pub use progress::{EventSink, ProgressEvent};
pub use surface::{MockSurface, PageSurface, SurfaceAdapter};
pub use workflow::{ItemCtx, ItemFlow, PipelineState};
