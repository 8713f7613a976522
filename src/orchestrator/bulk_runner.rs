//! 批量章节处理器 - 编排层
//!
//! ## 职责
//!
//! 对一个范围内的所有章节逐个调用 `ChapterProcessor`：
//!
//! 1. **确认门槛**：未确认不发出任何外部请求
//! 2. **严格顺序**：上一章的存储完全结束后才开始下一章的生成
//! 3. **失败隔离**：单章失败只记录，不中断批次
//! 4. **进度汇报**：每章结束后汇报 completed/total
//! 5. **可取消**：每章开始前检查取消标记

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::models::chapter::ChapterMeta;
use crate::models::curriculum::Chapter;
use crate::models::status::{ProcessingOutcome, ProcessingStatus};
use crate::services::generation::QuestionGenerator;
use crate::services::reporter::{Progress, ReportEvent, Severity, StatusReporter};
use crate::services::store::QuestionStore;
use crate::workflow::{ChapterCtx, ChapterProcessor};

/// 批量运行的显式确认
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Confirmed,
    Declined,
}

impl From<bool> for Confirmation {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Confirmation::Confirmed
        } else {
            Confirmation::Declined
        }
    }
}

/// 取消标记，在章节之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 单个章节的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutcome {
    pub meta: ChapterMeta,
    pub key: String,
    pub outcome: ProcessingOutcome,
}

/// 批量运行报告
#[derive(Debug, Clone, PartialEq)]
pub struct BulkReport {
    pub total: usize,
    pub completed: usize,
    /// 与输入顺序一致
    pub outcomes: Vec<ChapterOutcome>,
    /// 是否在中途被取消
    pub cancelled: bool,
}

impl BulkReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.completed - self.succeeded()
    }

    pub fn progress(&self) -> Progress {
        Progress::new(self.completed, self.total)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChapterOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_success())
    }
}

/// 批量运行器
pub struct BulkRunner<'a, G, S> {
    processor: &'a ChapterProcessor<G, S>,
    reporter: &'a dyn StatusReporter,
    cancel: CancelFlag,
}

impl<'a, G: QuestionGenerator, S: QuestionStore> BulkRunner<'a, G, S> {
    pub fn new(processor: &'a ChapterProcessor<G, S>, reporter: &'a dyn StatusReporter) -> Self {
        Self {
            processor,
            reporter,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// 顺序处理范围内的所有章节
    ///
    /// `template` 提供年级 / 科目 / 书本，章节字段逐个替换。
    pub async fn run(
        &self,
        chapters: &[Chapter],
        template: &ChapterMeta,
        confirmation: Confirmation,
    ) -> AppResult<BulkReport> {
        if confirmation != Confirmation::Confirmed {
            warn!("批量生成未确认，未发出任何请求");
            return Err(AppError::NotConfirmed);
        }

        let total = chapters.len();
        let mut report = BulkReport {
            total,
            completed: 0,
            outcomes: Vec::with_capacity(total),
            cancelled: false,
        };

        for chapter in chapters {
            self.reporter
                .report(ReportEvent::status(chapter.key(), ProcessingStatus::Pending));
        }
        self.reporter.report(ReportEvent::log(
            Severity::Info,
            format!(
                "批量开始: {} / {}，共 {} 个章节",
                template.class_name, template.subject, total
            ),
        ));

        for (idx, chapter) in chapters.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("⏹️ 批量运行已取消，剩余 {} 个章节未处理", total - idx);
                self.reporter.report(ReportEvent::log(
                    Severity::Warn,
                    format!("已取消，剩余 {} 个章节未处理", total - idx),
                ));
                report.cancelled = true;
                break;
            }

            let meta = template.for_chapter(chapter);
            let ctx = ChapterCtx::new(idx + 1, total, &meta);
            let outcome = self
                .processor
                .process_with_ctx(&meta, &ctx, self.reporter)
                .await;

            report.completed += 1;
            report.outcomes.push(ChapterOutcome {
                key: ctx.key,
                meta,
                outcome,
            });

            let progress = report.progress();
            info!("📈 进度 {}", progress);
            self.reporter.report(ReportEvent::Progress(progress));
        }

        self.reporter.report(ReportEvent::log(
            if report.failed() == 0 {
                Severity::Success
            } else {
                Severity::Warn
            },
            format!(
                "批量结束: 成功 {}，失败 {}，共 {}",
                report.succeeded(),
                report.failed(),
                total
            ),
        ));

        Ok(report)
    }
}
