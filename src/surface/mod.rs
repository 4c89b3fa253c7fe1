//! 页面适配层
//!
//! - `adapter` - 接口定义
//! - `page_surface` - 基于 chromiumoxide 页面的真实实现
//! - `mock_surface` - 确定性的测试替身
//! - `scripts` - 注入页面的 JS 片段

pub mod adapter;
pub mod mock_surface;
pub mod page_surface;
pub mod scripts;

pub use adapter::{ControlQuery, ElementHandle, ElementKind, SurfaceAdapter, SurfaceProbe};
pub use mock_surface::{AdvanceFault, MockFaults, MockSurface, PublishedChapter};
pub use page_surface::PageSurface;
