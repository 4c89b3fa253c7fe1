//! 真实页面适配器
//!
//! 通过 `JsExecutor` 在浏览器页面中执行脚本完成所有读写。

use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::error::SurfaceError;
use crate::infrastructure::JsExecutor;
use crate::surface::adapter::{
    ControlQuery, ElementHandle, ElementKind, SurfaceAdapter, SurfaceProbe,
};
use crate::surface::scripts::{self, BodyStrategy, PageSelectors};

/// 定位脚本的返回值
#[derive(Debug, Deserialize)]
struct Located {
    enabled: bool,
}

/// 基于浏览器页面的适配器
pub struct PageSurface {
    executor: JsExecutor,
    selectors: PageSelectors,
    next_handle: AtomicU64,
}

impl PageSurface {
    pub fn new(executor: JsExecutor) -> Self {
        Self::with_selectors(executor, PageSelectors::default())
    }

    pub fn with_selectors(executor: JsExecutor, selectors: PageSelectors) -> Self {
        Self {
            executor,
            selectors,
            next_handle: AtomicU64::new(1),
        }
    }

    fn allocate_handle_id(&self) -> String {
        self.next_handle.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// 执行定位脚本，脚本出错按"未找到"处理
    async fn locate(
        &self,
        kind: ElementKind,
        script_for: impl Fn(&str) -> String,
    ) -> Option<ElementHandle> {
        let id = self.allocate_handle_id();
        match self.executor.eval_as::<Option<Located>>(script_for(&id)).await {
            Ok(Some(located)) => {
                let handle = ElementHandle::new(kind, id);
                Some(if located.enabled { handle } else { handle.disabled() })
            }
            Ok(None) => None,
            Err(e) => {
                debug!("定位 {:?} 失败: {}", kind, e);
                None
            }
        }
    }

    async fn eval_flag(&self, script: String) -> bool {
        match self.executor.eval_as::<bool>(script).await {
            Ok(flag) => flag,
            Err(e) => {
                debug!("页面状态探测失败: {}", e);
                false
            }
        }
    }

    async fn eval_status(&self, script: String) -> Result<String, SurfaceError> {
        self.executor.eval_as::<String>(script).await
    }
}

#[async_trait]
impl SurfaceAdapter for PageSurface {
    fn name(&self) -> &str {
        "page"
    }

    async fn locate_title_field(&self) -> Option<ElementHandle> {
        let find = scripts::query_expr(&self.selectors.title_field);
        self.locate(ElementKind::TitleField, |id| scripts::locate_input(&find, id))
            .await
    }

    async fn set_title_value(
        &self,
        handle: &ElementHandle,
        text: &str,
    ) -> Result<(), SurfaceError> {
        let status = self
            .eval_status(scripts::set_input_value(&handle.locator, text))
            .await?;
        match status.as_str() {
            "ok" => Ok(()),
            "detached" => Err(SurfaceError::Detached("标题输入框".to_string())),
            _ => Err(SurfaceError::Rejected("标题输入框未接受写入的值".to_string())),
        }
    }

    async fn locate_editor_surface(&self) -> Option<ElementHandle> {
        let find = scripts::query_expr(&self.selectors.editor);
        self.locate(ElementKind::Editor, |id| scripts::locate_editor(&find, id))
            .await
    }

    async fn editor_ready(&self, handle: &ElementHandle) -> bool {
        self.eval_flag(scripts::editor_ready_by_handle(&handle.locator))
            .await
    }

    async fn set_body_content(
        &self,
        handle: &ElementHandle,
        text: &str,
    ) -> Result<(), SurfaceError> {
        write_with_fallback(|strategy| {
            self.eval_status(scripts::write_body(strategy, &handle.locator, text))
        })
        .await
        .map(|_| ())
    }

    async fn find_control(&self, query: &ControlQuery) -> Option<ElementHandle> {
        let find = scripts::control_expr(&self.selectors, &query.label);
        self.locate(ElementKind::Control, |id| scripts::locate_control(&find, id))
            .await
    }

    async fn click(&self, handle: &ElementHandle) -> Result<(), SurfaceError> {
        let status = self.eval_status(scripts::click(&handle.locator)).await?;
        match status.as_str() {
            "ok" => Ok(()),
            "detached" => Err(SurfaceError::Detached("按钮".to_string())),
            _ => Err(SurfaceError::Rejected("按钮处于禁用状态".to_string())),
        }
    }

    async fn surface_indicates_state(&self, probe: &SurfaceProbe) -> bool {
        let script = match probe {
            SurfaceProbe::TitleFieldPresent => {
                scripts::exists(&scripts::query_expr(&self.selectors.title_field))
            }
            SurfaceProbe::EditorReady => {
                scripts::editor_ready_by_expr(&scripts::query_expr(&self.selectors.editor))
            }
            SurfaceProbe::ControlPresent(query) => {
                scripts::exists(&scripts::control_expr(&self.selectors, &query.label))
            }
        };
        self.eval_flag(script).await
    }
}

/// 按顺序尝试各种正文写入方式，返回生效的那一种
///
/// `run` 执行一种写入方式并返回脚本状态：`ok` 成功，`detached` 说明编辑器已不在页面上，
/// 直接失败；其余状态或脚本错误都换下一种。
pub(crate) async fn write_with_fallback<F, Fut>(mut run: F) -> Result<BodyStrategy, SurfaceError>
where
    F: FnMut(BodyStrategy) -> Fut,
    Fut: Future<Output = Result<String, SurfaceError>>,
{
    for (attempt, strategy) in BodyStrategy::CHAIN.into_iter().enumerate() {
        match run(strategy).await.as_deref() {
            Ok("ok") => {
                debug!("正文写入成功: 方式 {} (第 {} 种)", strategy.name(), attempt + 1);
                return Ok(strategy);
            }
            Ok("detached") => {
                return Err(SurfaceError::Detached("编辑器".to_string()));
            }
            Ok(other) => {
                warn!("正文写入方式 {} 未生效 ({}), 尝试下一种", strategy.name(), other);
            }
            Err(e) => {
                warn!("正文写入方式 {} 执行失败: {}, 尝试下一种", strategy.name(), e);
            }
        }
    }

    Err(SurfaceError::AllStrategiesFailed {
        attempts: BodyStrategy::CHAIN.len(),
    })
}
