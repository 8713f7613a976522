//! # Chapter Quiz Gen
//!
//! 按课程章节批量生成选择题并写入存储服务的自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（HTTP 客户端），只暴露能力
//! - `HttpExecutor` - 唯一的 client owner，统一判断协作服务的成败
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个章节
//! - `QuestionGenerator` - 生成服务 / LLM 出题能力
//! - `QuestionStore` - 确保表存在、写入题目
//! - `StatusReporter` - 日志与状态表
//! - `SourceHostClient` - 读写仓库中的课程文档
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个章节"的完整处理流程
//! - `ChapterCtx` - 上下文封装（序号 + 章节键）
//! - `ChapterProcessor` - 流程编排（generate → persist）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/bulk_runner` - 批量章节处理器，顺序执行、失败隔离
//! - `orchestrator/app` - 应用入口，持有全部资源
//!
//! ## 模块结构

pub mod cli;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::HttpExecutor;
pub use models::{Chapter, ChapterMeta, CurriculumTree, ProcessingOutcome, SelectionState, Stage};
pub use orchestrator::{App, BulkReport, BulkRunner, CancelFlag, Confirmation};
pub use workflow::{ChapterCtx, ChapterProcessor};
