//! 状态报告 - 业务能力层
//!
//! 纯观察者：记录运行日志、维护"章节键 → 状态"表。
//! 报告本身永远不会失败，也不会中断被观察的流程。

use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::models::status::ProcessingStatus;

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

impl Severity {
    /// 日志行前缀
    pub fn indicator(self) -> &'static str {
        match self {
            Severity::Info => "•",
            Severity::Success => "✅",
            Severity::Warn => "⚠️",
            Severity::Error => "❌",
        }
    }
}

/// 批量进度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// 百分比；空批次视为已完成
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({:.0}%)", self.completed, self.total, self.percent())
    }
}

/// 报告事件
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    LogLine {
        text: String,
        severity: Severity,
    },
    StatusChange {
        chapter_key: String,
        status: ProcessingStatus,
        /// 失败时附带的错误信息
        detail: Option<String>,
    },
    Progress(Progress),
}

impl ReportEvent {
    pub fn log(severity: Severity, text: impl Into<String>) -> Self {
        ReportEvent::LogLine {
            text: text.into(),
            severity,
        }
    }

    pub fn status(chapter_key: impl Into<String>, status: ProcessingStatus) -> Self {
        ReportEvent::StatusChange {
            chapter_key: chapter_key.into(),
            status,
            detail: None,
        }
    }

    pub fn failed(chapter_key: impl Into<String>, detail: impl Into<String>) -> Self {
        ReportEvent::StatusChange {
            chapter_key: chapter_key.into(),
            status: ProcessingStatus::Fail,
            detail: Some(detail.into()),
        }
    }

    /// 单行文本形式
    pub fn render(&self) -> String {
        match self {
            ReportEvent::LogLine { text, severity } => format!("{} {}", severity.indicator(), text),
            ReportEvent::StatusChange {
                chapter_key,
                status,
                detail: Some(detail),
            } => format!("[{}] {}: {}", chapter_key, status, detail),
            ReportEvent::StatusChange {
                chapter_key,
                status,
                detail: None,
            } => format!("[{}] {}", chapter_key, status),
            ReportEvent::Progress(progress) => format!("📈 进度 {}", progress),
        }
    }
}

/// 状态报告能力
pub trait StatusReporter: Send + Sync {
    fn report(&self, event: ReportEvent);
}

impl<T: StatusReporter + ?Sized> StatusReporter for Arc<T> {
    fn report(&self, event: ReportEvent) {
        (**self).report(event)
    }
}

/// 一条运行日志
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub at: DateTime<Local>,
    pub severity: Severity,
    pub text: String,
}

/// 状态表中的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub chapter_key: String,
    pub status: ProcessingStatus,
    pub detail: Option<String>,
}

#[derive(Default)]
struct BoardState {
    log: VecDeque<LogEntry>,
    rows: Vec<StatusRow>,
    progress: Option<Progress>,
}

impl BoardState {
    fn row(&self, chapter_key: &str) -> Option<&StatusRow> {
        self.rows.iter().find(|r| r.chapter_key == chapter_key)
    }
}

/// 内存状态板：最新在前的日志 + 按章节键的状态表
#[derive(Default)]
pub struct StatusBoard {
    state: Mutex<BoardState>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// 日志（最新在前）
    pub fn log_lines(&self) -> Vec<LogEntry> {
        self.with_state(|s| s.log.iter().cloned().collect())
    }

    /// 状态表（按首次出现的顺序）
    pub fn rows(&self) -> Vec<StatusRow> {
        self.with_state(|s| s.rows.clone())
    }

    pub fn status_of(&self, chapter_key: &str) -> Option<ProcessingStatus> {
        self.with_state(|s| s.row(chapter_key).map(|r| r.status))
    }

    pub fn detail_of(&self, chapter_key: &str) -> Option<String> {
        self.with_state(|s| s.row(chapter_key).and_then(|r| r.detail.clone()))
    }

    pub fn progress(&self) -> Option<Progress> {
        self.with_state(|s| s.progress)
    }

    // 锁中毒时照样取出数据，报告不能因此失败
    fn with_state<R>(&self, f: impl FnOnce(&mut BoardState) -> R) -> R {
        let mut guard = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut *guard)
    }
}

impl StatusReporter for StatusBoard {
    fn report(&self, event: ReportEvent) {
        self.with_state(|s| match event {
            ReportEvent::LogLine { text, severity } => s.log.push_front(LogEntry {
                at: Local::now(),
                severity,
                text,
            }),
            ReportEvent::StatusChange {
                chapter_key,
                status,
                detail,
            } => match s.rows.iter_mut().find(|r| r.chapter_key == chapter_key) {
                Some(row) if row.status.can_transition_to(status) => {
                    row.status = status;
                    row.detail = detail;
                }
                Some(row) => {
                    warn!(
                        "忽略非法状态变更 [{}]: {} → {}",
                        chapter_key, row.status, status
                    );
                }
                None => s.rows.push(StatusRow {
                    chapter_key,
                    status,
                    detail,
                }),
            },
            ReportEvent::Progress(progress) => s.progress = Some(progress),
        });
    }
}

/// 输出到 tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl StatusReporter for TracingReporter {
    fn report(&self, event: ReportEvent) {
        let line = event.render();
        match event {
            ReportEvent::LogLine {
                severity: Severity::Error,
                ..
            } => error!("{}", line),
            ReportEvent::LogLine {
                severity: Severity::Warn,
                ..
            } => warn!("{}", line),
            _ => info!("{}", line),
        }
    }
}

/// 追加写入运行日志文件
pub struct LogFileReporter {
    path: String,
}

impl LogFileReporter {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    fn append(&self, line: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "[{}] {}", Local::now().format("%H:%M:%S"), line)
    }
}

impl StatusReporter for LogFileReporter {
    fn report(&self, event: ReportEvent) {
        if let Err(e) = self.append(&event.render()) {
            warn!("写入日志文件失败 ({}): {}", self.path, e);
        }
    }
}

/// 同时转发给多个报告器
#[derive(Default)]
pub struct MultiReporter {
    reporters: Vec<Box<dyn StatusReporter>>,
}

impl MultiReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, reporter: impl StatusReporter + 'static) -> Self {
        self.reporters.push(Box::new(reporter));
        self
    }
}

impl StatusReporter for MultiReporter {
    fn report(&self, event: ReportEvent) {
        for reporter in &self.reporters {
            reporter.report(event.clone());
        }
    }
}
