//! 章节处理流程 - 流程层
//!
//! 核心职责：定义"一个章节"的完整处理流程
//!
//! 流程顺序：
//! 1. WORKING
//! 2. 生成题目（空结果直接失败，不进入存储）
//! 3. 确保存储表存在 → 写入题目
//! 4. DONE / FAIL
//!
//! 任何错误都在这里收敛成 `ProcessingOutcome::Failure`，不会继续向上抛。

use tracing::{error, info, warn};

use crate::error::AppError;
use crate::models::chapter::ChapterMeta;
use crate::models::status::{ProcessingOutcome, ProcessingStatus, Stage};
use crate::services::generation::{GenerationResult, QuestionGenerator};
use crate::services::reporter::{ReportEvent, Severity, StatusReporter};
use crate::services::store::{PersistReceipt, QuestionStore};
use crate::utils::logging::truncate_text;
use crate::workflow::chapter_ctx::ChapterCtx;

/// 章节处理器
///
/// - 编排 生成 → 存储 两个阶段
/// - 不重试：任一阶段失败立即结束本次尝试
/// - 只依赖业务能力（generator / store / reporter）
pub struct ChapterProcessor<G, S> {
    generator: G,
    store: S,
    verbose_logging: bool,
}

impl<G: QuestionGenerator, S: QuestionStore> ChapterProcessor<G, S> {
    pub fn new(generator: G, store: S) -> Self {
        Self {
            generator,
            store,
            verbose_logging: false,
        }
    }

    pub fn with_verbose(mut self, verbose_logging: bool) -> Self {
        self.verbose_logging = verbose_logging;
        self
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 处理单个章节
    pub async fn process(
        &self,
        meta: &ChapterMeta,
        reporter: &dyn StatusReporter,
    ) -> ProcessingOutcome {
        self.process_with_ctx(meta, &ChapterCtx::single(meta), reporter)
            .await
    }

    /// 处理批次中的一个章节
    pub async fn process_with_ctx(
        &self,
        meta: &ChapterMeta,
        ctx: &ChapterCtx,
        reporter: &dyn StatusReporter,
    ) -> ProcessingOutcome {
        info!("{} 开始处理: {}", ctx, meta);
        reporter.report(ReportEvent::status(&ctx.key, ProcessingStatus::Working));
        reporter.report(ReportEvent::log(
            Severity::Info,
            format!("{} 开始生成…", meta.chapter),
        ));

        let outcome = match self.run_stages(meta, ctx, reporter).await {
            Ok(receipt) => ProcessingOutcome::Success {
                table_name: receipt.table_name,
                inserted_count: receipt.inserted,
            },
            Err((stage, err)) => ProcessingOutcome::failure(stage, err.to_string()),
        };

        match &outcome {
            ProcessingOutcome::Success {
                table_name,
                inserted_count,
            } => {
                info!("{} ✓ 已写入 {} 道题目到表 {}", ctx, inserted_count, table_name);
                reporter.report(ReportEvent::status(&ctx.key, ProcessingStatus::Done));
                reporter.report(ReportEvent::log(
                    Severity::Success,
                    format!("{}: {} 道题目 → {}", meta.chapter, inserted_count, table_name),
                ));
            }
            ProcessingOutcome::Failure { stage, message } => {
                error!("{} ❌ {} 阶段失败: {}", ctx, stage, message);
                reporter.report(ReportEvent::failed(&ctx.key, message.clone()));
                reporter.report(ReportEvent::log(
                    Severity::Error,
                    format!("{} [{}]: {}", meta.chapter, stage, message),
                ));
            }
        }

        outcome
    }

    async fn run_stages(
        &self,
        meta: &ChapterMeta,
        ctx: &ChapterCtx,
        reporter: &dyn StatusReporter,
    ) -> Result<PersistReceipt, (Stage, AppError)> {
        let generate = |e: AppError| (Stage::Generate, e);
        let persist = |e: AppError| (Stage::Persist, e);

        meta.validate().map_err(generate)?;

        // ========== 阶段 1: 生成 ==========
        let GenerationResult {
            table_name,
            questions,
        } = self.generator.generate(meta).await.map_err(generate)?;

        if questions.is_empty() {
            warn!("{} ⚠️ 生成结果为空，跳过存储", ctx);
            return Err(generate(AppError::EmptyResult));
        }

        if table_name.trim().is_empty() {
            warn!("{} ⚠️ 存储表名为空，跳过存储", ctx);
            return Err(generate(AppError::invalid_input("存储表名为空")));
        }

        info!("{} ✓ 生成 {} 道题目，目标表 {}", ctx, questions.len(), table_name);
        if self.verbose_logging {
            for (i, q) in questions.iter().take(2).enumerate() {
                info!(
                    "{}   {}. [{}] {}",
                    ctx,
                    i + 1,
                    q.difficulty,
                    truncate_text(&q.question_text, 80)
                );
            }
        }
        reporter.report(ReportEvent::log(
            Severity::Info,
            format!("{}: 已生成 {} 道题目，正在保存…", meta.chapter, questions.len()),
        ));

        // ========== 阶段 2: 存储 ==========
        self.store
            .ensure_schema(&table_name)
            .await
            .map_err(persist)?;

        let mut receipt = self
            .store
            .insert_rows(&table_name, &questions)
            .await
            .map_err(persist)?;

        if receipt.table_name.is_empty() {
            receipt.table_name = table_name;
        }
        if receipt.inserted != questions.len() {
            warn!(
                "{} ⚠️ 写入行数 {} 与生成数量 {} 不一致",
                ctx,
                receipt.inserted,
                questions.len()
            );
        }

        Ok(receipt)
    }
}
