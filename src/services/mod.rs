//! 业务能力层
//!
//! 只处理单个能力，不关心流程顺序

pub mod failure_writer;

pub use failure_writer::FailureWriter;
