//! 编排层
//!
//! - `batch_orchestrator` - 逐个驱动章节流程，维护批次状态
//! - `control` - 暂停 / 继续 / 停止 / 中止 的控制句柄
//! - `operator_console` - 控制台命令与 Ctrl+C
//! - `batch_processor` - 应用入口，持有浏览器资源

pub mod batch_orchestrator;
pub mod batch_processor;
pub mod control;
pub mod operator_console;

pub use batch_orchestrator::BatchOrchestrator;
pub use batch_processor::App;
pub use control::BatchControl;
pub use operator_console::OperatorCommand;
