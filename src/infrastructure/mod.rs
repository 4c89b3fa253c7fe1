pub mod js_executor;
pub mod poller;

pub use js_executor::JsExecutor;
pub use poller::{sleep_cancellable, wait_until, WaitOutcome};
