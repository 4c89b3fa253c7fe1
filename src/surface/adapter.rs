//! 页面适配层接口
//!
//! 引擎读写外部页面的唯一窄接口。真实实现（`PageSurface`）与测试替身
//! （`MockSurface`）都实现 `SurfaceAdapter`。

use async_trait::async_trait;

use crate::config::ControlLabels;
use crate::error::SurfaceError;

/// 元素种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    TitleField,
    Editor,
    Control,
}

/// 页面元素句柄
///
/// 只是一个定位标记，每次使用时由适配器重新解析；页面重新渲染后
/// 旧句柄会失效（`SurfaceError::Detached`），调用方应重新定位而不是缓存。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    pub kind: ElementKind,
    /// 适配器内部使用的定位标记
    pub locator: String,
    /// 定位时元素是否可用（按钮未禁用）
    pub enabled: bool,
}

impl ElementHandle {
    pub fn new(kind: ElementKind, locator: impl Into<String>) -> Self {
        Self {
            kind,
            locator: locator.into(),
            enabled: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// 按钮查询条件：文字不区分大小写地包含 `label`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlQuery {
    pub label: String,
}

impl ControlQuery {
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn publish(labels: &ControlLabels) -> Self {
        Self::label(&labels.publish)
    }

    pub fn confirm(labels: &ControlLabels) -> Self {
        Self::label(&labels.confirm)
    }

    pub fn create_next(labels: &ControlLabels) -> Self {
        Self::label(&labels.create_next)
    }

    /// 与按钮文字比较（去除首尾空白，忽略大小写）
    pub fn matches(&self, text: &str) -> bool {
        text.trim()
            .to_uppercase()
            .contains(&self.label.trim().to_uppercase())
    }
}

/// 页面状态探测条件，作为轮询器的判断依据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceProbe {
    /// 标题输入框存在
    TitleFieldPresent,
    /// 编辑器存在且可交互
    EditorReady,
    /// 存在匹配的按钮
    ControlPresent(ControlQuery),
}

/// 页面适配器
///
/// 除了重新定位元素所需的信息外不持有任何状态，副作用只作用于外部页面。
#[async_trait]
pub trait SurfaceAdapter: Send + Sync {
    /// 适配器名称（日志用）
    fn name(&self) -> &str;

    async fn locate_title_field(&self) -> Option<ElementHandle>;

    /// 写入标题，效果必须与用户输入一致（页面上的监听器能收到变更通知）
    async fn set_title_value(&self, handle: &ElementHandle, text: &str)
        -> Result<(), SurfaceError>;

    /// 定位编辑器；存在不代表可交互，可交互性用 `editor_ready` 判断
    async fn locate_editor_surface(&self) -> Option<ElementHandle>;

    async fn editor_ready(&self, handle: &ElementHandle) -> bool;

    /// 以纯文本写入正文并保留换行；主写入方式失败时至少再尝试一种备用方式，
    /// 全部失败才返回错误
    async fn set_body_content(&self, handle: &ElementHandle, text: &str)
        -> Result<(), SurfaceError>;

    async fn find_control(&self, query: &ControlQuery) -> Option<ElementHandle>;

    async fn click(&self, handle: &ElementHandle) -> Result<(), SurfaceError>;

    /// 通用页面状态探测
    async fn surface_indicates_state(&self, probe: &SurfaceProbe) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_query_matches_case_insensitively() {
        let query = ControlQuery::create_next(&ControlLabels::default());
        assert!(query.matches("  + Create Chapter "));
        assert!(query.matches("CREATE CHAPTER"));
        assert!(!query.matches("Create"));

        let publish = ControlQuery::label("publish");
        assert!(publish.matches("Publish now"));
    }
}
