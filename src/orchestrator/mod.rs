//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 创建并持有所有资源（HTTP 执行器、生成器、存储、报告器）
//! - 加载课程树，执行各个命令
//!
//! ### `bulk_runner` - 批量章节处理器
//! - 确认门槛、严格顺序、失败隔离、进度汇报、取消
//!
//! ## 层次关系
//!
//! ```text
//! app
//!     ↓
//! bulk_runner (处理 Vec<Chapter>)
//!     ↓
//! workflow::ChapterProcessor (处理单个章节)
//!     ↓
//! services (能力层：generation / store / reporter / source_host)
//!     ↓
//! infrastructure (基础设施：HttpExecutor)
//! ```

pub mod app;
pub mod bulk_runner;

pub use app::{App, Generator};
pub use bulk_runner::{BulkReport, BulkRunner, CancelFlag, ChapterOutcome, Confirmation};
