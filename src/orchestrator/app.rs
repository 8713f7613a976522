//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：日志文件、HTTP 执行器、生成器、存储、报告器
//! 2. **课程加载**：按年级加载课程树
//! 3. **命令执行**：查看课程、单章生成、批量生成、规整仓库中的课程文档
//! 4. **失败记录**：把失败章节写入失败记录文件
//!
//! 资源只在这里创建，向下以引用传递。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{Config, GenerationMode};
use crate::error::{AppError, AppResult};
use crate::infrastructure::HttpExecutor;
use crate::models::chapter::{ChapterMeta, SelectionState};
use crate::models::curriculum::{CurriculumTree, TreeShape};
use crate::models::loaders::{parse_curriculum, CurriculumLoader, CurriculumSource};
use crate::models::status::{ProcessingOutcome, Stage};
use crate::orchestrator::bulk_runner::{BulkReport, BulkRunner, CancelFlag, Confirmation};
use crate::services::generation::{GenerationResult, HttpGenerator, QuestionGenerator};
use crate::services::{
    FailureWriter, HttpStore, LlmService, LogFileReporter, MultiReporter, ReportEvent, Severity,
    SourceHostClient, StatusBoard, StatusReporter, TracingReporter,
};
use crate::utils::logging;
use crate::workflow::ChapterProcessor;

/// 按配置选择的生成器
pub enum Generator {
    Endpoint(HttpGenerator),
    Llm(LlmService),
}

impl QuestionGenerator for Generator {
    async fn generate(&self, meta: &ChapterMeta) -> AppResult<GenerationResult> {
        match self {
            Generator::Endpoint(generator) => generator.generate(meta).await,
            Generator::Llm(generator) => generator.generate(meta).await,
        }
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    http: HttpExecutor,
    source_host: Option<SourceHostClient>,
    processor: ChapterProcessor<Generator, HttpStore>,
    board: Arc<StatusBoard>,
    reporter: MultiReporter,
    failures: FailureWriter,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        logging::init_log_file(&config.output_log_file)?;

        let http = HttpExecutor::new(
            Duration::from_secs(config.request_timeout_secs),
            config.service_key(),
        )?;

        let source_host = if config.has_repo() {
            Some(SourceHostClient::new(&config)?)
        } else {
            None
        };

        let generator = match config.generation_mode {
            GenerationMode::Endpoint => {
                Generator::Endpoint(HttpGenerator::new(http.clone(), &config.generation_url))
            }
            GenerationMode::Llm => Generator::Llm(LlmService::new(&config)),
        };
        let store = HttpStore::new(http.clone(), &config.persistence_url);
        let processor =
            ChapterProcessor::new(generator, store).with_verbose(config.verbose_logging);

        let board = Arc::new(StatusBoard::new());
        let reporter = MultiReporter::new()
            .with(board.clone())
            .with(TracingReporter)
            .with(LogFileReporter::new(&config.output_log_file));

        let failures = FailureWriter::new(&config.failure_log_file);

        Ok(Self {
            config,
            http,
            source_host,
            processor,
            board,
            reporter,
            failures,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    /// 加载一个年级的课程树
    pub async fn load_tree(&self, class_name: &str) -> AppResult<CurriculumTree> {
        CurriculumLoader::new(
            &self.config.curriculum_source,
            &self.http,
            self.source_host.as_ref(),
        )
        .load(class_name)
        .await
    }

    /// 打印课程树
    pub async fn show_tree(&self, class_name: &str) -> AppResult<()> {
        let tree = self.load_tree(class_name).await?;
        if tree.is_empty() {
            warn!("⚠️ 年级 {} 没有任何科目", class_name);
            return Ok(());
        }

        for subject in tree.subjects() {
            match tree.shape(subject) {
                Some(TreeShape::Books) => {
                    info!("📘 {} ({})", subject, TreeShape::Books);
                    for book in tree.books(subject)? {
                        info!("  📖 {}", book);
                        for chapter in tree.chapters(subject, Some(book))? {
                            info!("    - {} [{}]", chapter.chapter_title, chapter.key());
                        }
                    }
                }
                _ => {
                    info!("📘 {} ({})", subject, TreeShape::Flat);
                    for chapter in tree.chapters(subject, None)? {
                        info!("  - {} [{}]", chapter.chapter_title, chapter.key());
                    }
                }
            }
        }
        Ok(())
    }

    /// 单章生成
    pub async fn generate(&self, selection: &SelectionState) -> AppResult<ProcessingOutcome> {
        let tree = self.load_tree(&selection.class_name).await?;

        let (meta, outcome) = match selection.to_meta(&tree) {
            Ok(meta) => {
                let outcome = self.processor.process(&meta, &self.reporter).await;
                (meta, outcome)
            }
            Err(err) => {
                let meta = requested_meta(selection);
                let outcome = self.reject(&meta, err);
                (meta, outcome)
            }
        };

        if let ProcessingOutcome::Failure { stage, message } = &outcome {
            self.record_failure(&meta, *stage, message);
        }
        Ok(outcome)
    }

    /// 选择无效（章节为空或不在课程树中）按生成阶段失败处理
    fn reject(&self, meta: &ChapterMeta, err: AppError) -> ProcessingOutcome {
        let message = err.to_string();
        error!("❌ 选择无效 ({}): {}", meta, message);
        self.reporter
            .report(ReportEvent::failed(meta.key(), message.clone()));
        self.reporter.report(ReportEvent::log(
            Severity::Error,
            format!("{} [{}]: {}", meta.chapter, Stage::Generate, message),
        ));
        ProcessingOutcome::failure(Stage::Generate, message)
    }

    /// 批量生成
    pub async fn bulk(
        &self,
        selection: &SelectionState,
        confirmation: Confirmation,
        cancel: CancelFlag,
    ) -> AppResult<BulkReport> {
        let tree = self.load_tree(&selection.class_name).await?;
        let chapters = selection.chapters_in_scope(&tree)?;
        let template = selection.scope_template()?;

        let scope = if template.book.is_empty() {
            format!("{} / {}", template.class_name, template.subject)
        } else {
            format!("{} / {} / {}", template.class_name, template.subject, template.book)
        };
        logging::log_bulk_start(&scope, chapters.len());

        let report = BulkRunner::new(&self.processor, &self.reporter)
            .with_cancel(cancel)
            .run(chapters, &template, confirmation)
            .await?;

        for failure in report.failures() {
            if let ProcessingOutcome::Failure { stage, message } = &failure.outcome {
                self.record_failure(&failure.meta, *stage, message);
            }
        }

        logging::print_final_stats(
            report.succeeded(),
            report.failed(),
            report.total,
            &self.config.output_log_file,
        );

        Ok(report)
    }

    /// 把仓库中脚本包装的课程文档改写为严格 JSON
    pub async fn normalize(&self, class_name: &str, message: &str) -> AppResult<bool> {
        let path = match CurriculumSource::resolve(&self.config.curriculum_source, class_name) {
            CurriculumSource::Repo(path) => path,
            other => {
                return Err(AppError::Config(format!(
                    "课程来源 {} 不是仓库文件 (repo:<path>)",
                    other
                )))
            }
        };
        let client = self.source_host.as_ref().ok_or_else(|| {
            AppError::Config("未配置代码托管仓库".to_string())
        })?;

        let file = client.fetch_file(&path).await?;
        let tree = parse_curriculum(&file.content)?;
        let normalized = serde_json::to_string_pretty(&tree)
            .map_err(|e| AppError::parse(e.to_string()))?
            + "\n";

        if normalized == file.content {
            info!("✓ {} 已是严格 JSON，无需更新", path);
            return Ok(false);
        }

        let sha = client.update_file(&file, &normalized, message).await?;
        info!("✓ {} 已更新 (sha: {})", path, sha);
        Ok(true)
    }

    fn record_failure(&self, meta: &ChapterMeta, stage: Stage, message: &str) {
        if let Err(e) = self.failures.write(meta, stage, message) {
            warn!("写入失败记录失败: {}", e);
        }
    }
}

/// 按用户输入原样拼出的元数据，缺失字段留空
fn requested_meta(selection: &SelectionState) -> ChapterMeta {
    ChapterMeta {
        class_name: selection.class_name.clone(),
        subject: selection.subject.clone().unwrap_or_default(),
        book: selection.book.clone().unwrap_or_default(),
        chapter: selection.chapter.clone().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::status::ProcessingStatus;

    fn test_app(dir: &tempfile::TempDir) -> App {
        std::fs::write(
            dir.path().join("class-6.json"),
            r#"{"Science": [{"chapter_title": "Light"}, {"chapter_title": "Sound"}]}"#,
        )
        .unwrap();
        let path = |name: &str| dir.path().join(name).to_str().unwrap().to_string();
        let config = Config {
            curriculum_source: path("class-{class}.json"),
            output_log_file: path("output.txt"),
            failure_log_file: path("failed.txt"),
            ..Config::default()
        };
        App::initialize(config).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_chapter_is_generate_failure() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let selection = SelectionState::new("6")
            .with_subject("Science")
            .with_chapter("Magnets");

        let outcome = app.generate(&selection).await.unwrap();

        match outcome {
            ProcessingOutcome::Failure { stage, message } => {
                assert_eq!(stage, Stage::Generate);
                assert!(message.contains("Magnets"), "{}", message);
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(app.board().status_of("magnets"), Some(ProcessingStatus::Fail));

        let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
        assert!(failed.starts_with("6 | Science |  | Magnets | GENERATE | "), "{}", failed);
    }

    #[tokio::test]
    async fn test_blank_chapter_is_generate_failure() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir);
        let selection = SelectionState::new("6")
            .with_subject("Science")
            .with_chapter("");

        let outcome = app.generate(&selection).await.unwrap();

        assert!(matches!(
            outcome,
            ProcessingOutcome::Failure {
                stage: Stage::Generate,
                ..
            }
        ));
        let failed = std::fs::read_to_string(dir.path().join("failed.txt")).unwrap();
        assert_eq!(failed.lines().count(), 1);
    }
}
