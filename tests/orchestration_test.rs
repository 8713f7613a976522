use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chapter_quiz_gen::error::{AppError, AppResult, UpstreamError};
use chapter_quiz_gen::models::question::GeneratedQuestion;
use chapter_quiz_gen::models::status::ProcessingStatus;
use chapter_quiz_gen::models::{Chapter, ChapterMeta, ProcessingOutcome, SelectionState, Stage};
use chapter_quiz_gen::orchestrator::{BulkRunner, CancelFlag, Confirmation};
use chapter_quiz_gen::services::generation::{GenerationResult, QuestionGenerator};
use chapter_quiz_gen::services::reporter::{
    MultiReporter, Progress, ReportEvent, StatusBoard, StatusReporter,
};
use chapter_quiz_gen::services::store::{PersistReceipt, QuestionStore};
use chapter_quiz_gen::utils::table_name_for;
use chapter_quiz_gen::workflow::ChapterProcessor;

type CallLog = Arc<Mutex<Vec<String>>>;

fn sample_question(n: usize) -> GeneratedQuestion {
    GeneratedQuestion {
        difficulty: "easy".to_string(),
        question_type: "conceptual".to_string(),
        question_text: format!("Question {}", n),
        scenario_reason_text: None,
        option_a: "A".to_string(),
        option_b: "B".to_string(),
        option_c: "C".to_string(),
        option_d: "D".to_string(),
        correct_answer_key: "A".to_string(),
    }
}

/// 按章节名返回固定数量的题目，可指定失败章节
struct FakeGenerator {
    per_chapter: usize,
    empty_for: HashSet<String>,
    fail_for: HashSet<String>,
    calls: CallLog,
}

impl QuestionGenerator for FakeGenerator {
    async fn generate(&self, meta: &ChapterMeta) -> AppResult<GenerationResult> {
        self.calls.lock().unwrap().push(format!("generate:{}", meta.chapter));
        if self.fail_for.contains(&meta.chapter) {
            return Err(UpstreamError::BadStatus {
                endpoint: "/api/generate".to_string(),
                status: 500,
                message: "model overloaded".to_string(),
            }
            .into());
        }
        let count = if self.empty_for.contains(&meta.chapter) {
            0
        } else {
            self.per_chapter
        };
        Ok(GenerationResult {
            table_name: table_name_for(&meta.chapter),
            questions: (0..count).map(sample_question).collect(),
        })
    }
}

/// 记录调用，可指定写入失败的表
struct FakeStore {
    fail_insert_for: HashSet<String>,
    fail_schema_for: HashSet<String>,
    calls: CallLog,
}

impl QuestionStore for FakeStore {
    async fn ensure_schema(&self, table_name: &str) -> AppResult<()> {
        self.calls.lock().unwrap().push(format!("ensure:{}", table_name));
        if self.fail_schema_for.contains(table_name) {
            return Err(UpstreamError::ServiceError {
                endpoint: "/api/store/ensure-schema".to_string(),
                message: "permission denied".to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn insert_rows(
        &self,
        table_name: &str,
        rows: &[GeneratedQuestion],
    ) -> AppResult<PersistReceipt> {
        self.calls.lock().unwrap().push(format!("insert:{}", table_name));
        if self.fail_insert_for.contains(table_name) {
            return Err(UpstreamError::BadStatus {
                endpoint: "/api/store/insert".to_string(),
                status: 500,
                message: "duplicate key".to_string(),
            }
            .into());
        }
        Ok(PersistReceipt {
            table_name: table_name.to_string(),
            inserted: rows.len(),
        })
    }
}

struct Harness {
    processor: ChapterProcessor<FakeGenerator, FakeStore>,
    calls: CallLog,
}

impl Harness {
    fn new() -> Self {
        Self::build(60, &[], &[], &[], &[])
    }

    fn build(
        per_chapter: usize,
        empty_for: &[&str],
        fail_generate_for: &[&str],
        fail_schema_for: &[&str],
        fail_insert_for: &[&str],
    ) -> Self {
        let set = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<HashSet<_>>();
        let calls: CallLog = Arc::default();
        let generator = FakeGenerator {
            per_chapter,
            empty_for: set(empty_for),
            fail_for: set(fail_generate_for),
            calls: calls.clone(),
        };
        let store = FakeStore {
            fail_insert_for: set(fail_insert_for),
            fail_schema_for: set(fail_schema_for),
            calls: calls.clone(),
        };
        Self {
            processor: ChapterProcessor::new(generator, store),
            calls,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn store_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("ensure:") || c.starts_with("insert:"))
            .count()
    }
}

fn meta(chapter: &str) -> ChapterMeta {
    ChapterMeta {
        class_name: "6".to_string(),
        subject: "Science".to_string(),
        book: String::new(),
        chapter: chapter.to_string(),
    }
}

fn chapters(titles: &[&str]) -> Vec<Chapter> {
    titles.iter().map(|t| Chapter::new(*t)).collect()
}

/// 收集所有事件，用于检查进度序列
#[derive(Default)]
struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    fn progress(&self) -> Vec<Progress> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| match e {
                ReportEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&self, event: ReportEvent) {
        self.events.lock().unwrap().push(event);
    }
}

// ========== 单章处理 ==========

#[tokio::test]
async fn test_success_reports_table_and_count() {
    let harness = Harness::new();
    let board = StatusBoard::new();

    let outcome = harness.processor.process(&meta("Light"), &board).await;

    assert_eq!(
        outcome,
        ProcessingOutcome::Success {
            table_name: "light".to_string(),
            inserted_count: 60,
        }
    );
    assert_eq!(board.status_of("light"), Some(ProcessingStatus::Done));
    assert_eq!(
        harness.calls(),
        vec!["generate:Light", "ensure:light", "insert:light"]
    );
}

#[tokio::test]
async fn test_empty_generation_never_persists() {
    let harness = Harness::build(60, &["Light"], &[], &[], &[]);
    let board = StatusBoard::new();

    let outcome = harness.processor.process(&meta("Light"), &board).await;

    assert_eq!(
        outcome,
        ProcessingOutcome::Failure {
            stage: Stage::Generate,
            message: "empty result".to_string(),
        }
    );
    assert_eq!(harness.store_calls(), 0);
    assert_eq!(board.status_of("light"), Some(ProcessingStatus::Fail));
    assert_eq!(board.detail_of("light").as_deref(), Some("empty result"));
}

#[tokio::test]
async fn test_generation_error_is_generate_failure() {
    let harness = Harness::build(60, &[], &["Light"], &[], &[]);
    let board = StatusBoard::new();

    let outcome = harness.processor.process(&meta("Light"), &board).await;

    match outcome {
        ProcessingOutcome::Failure { stage, message } => {
            assert_eq!(stage, Stage::Generate);
            assert!(message.contains("model overloaded"), "{}", message);
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(harness.store_calls(), 0);

    // 失败日志行带失败标记
    let newest = &board.log_lines()[0];
    assert!(newest.text.contains("GENERATE"));
}

#[tokio::test]
async fn test_schema_error_is_persist_failure() {
    let harness = Harness::build(60, &[], &[], &["light"], &[]);
    let board = StatusBoard::new();

    let outcome = harness.processor.process(&meta("Light"), &board).await;

    assert!(matches!(
        outcome,
        ProcessingOutcome::Failure {
            stage: Stage::Persist,
            ..
        }
    ));
    assert_eq!(harness.calls(), vec!["generate:Light", "ensure:light"]);
}

#[tokio::test]
async fn test_invalid_meta_calls_nothing() {
    let harness = Harness::new();
    let board = StatusBoard::new();
    let mut bad = meta("Light");
    bad.subject = String::new();

    let outcome = harness.processor.process(&bad, &board).await;

    match outcome {
        ProcessingOutcome::Failure { stage, message } => {
            assert_eq!(stage, Stage::Generate);
            assert!(message.contains("subject"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(harness.calls().is_empty());
}

#[test]
fn test_process_from_sync_context() {
    let harness = Harness::build(5, &[], &[], &[], &[]);
    let board = StatusBoard::new();
    let outcome = tokio_test::block_on(harness.processor.process(&meta("Sound"), &board));
    assert_eq!(
        outcome,
        ProcessingOutcome::Success {
            table_name: "sound".to_string(),
            inserted_count: 5,
        }
    );
}

// ========== 批量处理 ==========

#[tokio::test]
async fn test_bulk_isolates_mid_batch_failure() {
    let harness = Harness::build(60, &[], &[], &[], &["sound"]);
    let board = StatusBoard::new();
    let list = chapters(&["Light", "Sound", "Motion and Time"]);

    let report = BulkRunner::new(&harness.processor, &board)
        .run(&list, &meta(""), Confirmation::Confirmed)
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.completed, 3);
    assert!(!report.cancelled);
    let outcomes: Vec<_> = report.outcomes.iter().map(|o| &o.outcome).collect();
    assert!(outcomes[0].is_success());
    assert!(matches!(
        outcomes[1],
        ProcessingOutcome::Failure {
            stage: Stage::Persist,
            ..
        }
    ));
    assert!(outcomes[2].is_success());
    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);
    assert_eq!(board.progress().map(|p| p.percent()), Some(100.0));

    // 严格顺序：上一章的存储结束后才开始下一章的生成
    assert_eq!(
        harness.calls(),
        vec![
            "generate:Light",
            "ensure:light",
            "insert:light",
            "generate:Sound",
            "ensure:sound",
            "insert:sound",
            "generate:Motion and Time",
            "ensure:motion_and_time",
            "insert:motion_and_time",
        ]
    );
}

#[tokio::test]
async fn test_bulk_outcomes_keep_input_order() {
    let harness = Harness::build(3, &["B"], &["D"], &[], &[]);
    let board = StatusBoard::new();
    let titles = ["A", "B", "C", "D", "E"];
    let list = chapters(&titles);

    let report = BulkRunner::new(&harness.processor, &board)
        .run(&list, &meta(""), Confirmation::Confirmed)
        .await
        .unwrap();

    let seen: Vec<_> = report.outcomes.iter().map(|o| o.meta.chapter.as_str()).collect();
    assert_eq!(seen, titles);
    let keys: Vec<_> = report.outcomes.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(keys, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(report.failures().count(), 2);
}

#[tokio::test]
async fn test_bulk_progress_steps() {
    let harness = Harness::build(1, &[], &["Ch 5"], &[], &[]);
    let recorder = RecordingReporter::default();
    let titles: Vec<String> = (1..=12).map(|i| format!("Ch {}", i)).collect();
    let list: Vec<Chapter> = titles.iter().map(Chapter::new).collect();

    BulkRunner::new(&harness.processor, &recorder)
        .run(&list, &meta(""), Confirmation::Confirmed)
        .await
        .unwrap();

    let progress = recorder.progress();
    assert_eq!(progress.len(), 12);
    for (k, p) in progress.iter().enumerate() {
        assert_eq!(*p, Progress::new(k + 1, 12));
    }
    assert_eq!(progress[2].percent(), 25.0);
}

#[tokio::test]
async fn test_bulk_requires_confirmation() {
    let harness = Harness::new();
    let board = StatusBoard::new();
    let list = chapters(&["Light", "Sound"]);

    let result = BulkRunner::new(&harness.processor, &board)
        .run(&list, &meta(""), Confirmation::from(false))
        .await;

    assert!(matches!(result, Err(AppError::NotConfirmed)));
    assert!(harness.calls().is_empty());
    assert!(board.rows().is_empty());
}

/// 第一章结束后触发取消
struct CancelAfterFirst {
    cancel: CancelFlag,
}

impl StatusReporter for CancelAfterFirst {
    fn report(&self, event: ReportEvent) {
        if let ReportEvent::Progress(p) = event {
            if p.completed == 1 {
                self.cancel.cancel();
            }
        }
    }
}

#[tokio::test]
async fn test_bulk_cancel_between_chapters() {
    let harness = Harness::new();
    let cancel = CancelFlag::new();
    let board = Arc::new(StatusBoard::new());
    let reporter = MultiReporter::new().with(board.clone()).with(CancelAfterFirst {
        cancel: cancel.clone(),
    });
    let list = chapters(&["Light", "Sound", "Magnets"]);

    let report = BulkRunner::new(&harness.processor, &reporter)
        .with_cancel(cancel)
        .run(&list, &meta(""), Confirmation::Confirmed)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.completed, 1);
    assert_eq!(report.outcomes.len(), 1);
    assert_eq!(board.status_of("light"), Some(ProcessingStatus::Done));
    assert_eq!(board.status_of("sound"), Some(ProcessingStatus::Pending));
    assert_eq!(board.status_of("magnets"), Some(ProcessingStatus::Pending));
    assert_eq!(harness.calls().len(), 3);
}

#[tokio::test]
async fn test_bulk_empty_scope() {
    let harness = Harness::new();
    let board = StatusBoard::new();

    let report = BulkRunner::new(&harness.processor, &board)
        .run(&[], &meta(""), Confirmation::Confirmed)
        .await
        .unwrap();

    assert_eq!(report.total, 0);
    assert!(report.outcomes.is_empty());
    assert_eq!(report.progress().percent(), 100.0);
}

// ========== 课程选择 → 批量 ==========

#[tokio::test]
async fn test_selection_scope_drives_bulk() {
    let tree = chapter_quiz_gen::models::loaders::parse_curriculum(
        r#"{"Science": [{"chapter_title": "Light"}, {"chapter_title": "Sound"}]}"#,
    )
    .unwrap();
    let selection = SelectionState::new("6").with_subject("Science");

    let in_scope = selection.chapters_in_scope(&tree).unwrap();
    let titles: Vec<_> = in_scope.iter().map(|c| c.chapter_title.as_str()).collect();
    assert_eq!(titles, vec!["Light", "Sound"]);

    let harness = Harness::new();
    let board = StatusBoard::new();
    let template = selection.scope_template().unwrap();
    let report = BulkRunner::new(&harness.processor, &board)
        .run(in_scope, &template, Confirmation::Confirmed)
        .await
        .unwrap();

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.outcomes[1].meta, meta("Sound"));
}

#[tokio::test]
async fn test_titles_without_ascii_keep_separate_rows() {
    let harness = Harness::build(1, &[], &[], &[], &[]);
    let board = StatusBoard::new();
    let list = chapters(&["पौधों का पोषण", "जल"]);

    let report = BulkRunner::new(&harness.processor, &board)
        .run(&list, &meta(""), Confirmation::Confirmed)
        .await
        .unwrap();

    for outcome in &report.outcomes {
        match &outcome.outcome {
            ProcessingOutcome::Failure { stage, message } => {
                assert_eq!(*stage, Stage::Generate);
                assert!(message.contains("存储表名为空"), "{}", message);
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }
    assert_eq!(harness.store_calls(), 0);

    let rows = board.rows();
    assert_eq!(rows.len(), 2);
    assert_eq!(board.status_of("पौधों का पोषण"), Some(ProcessingStatus::Fail));
    assert_eq!(board.status_of("जल"), Some(ProcessingStatus::Fail));
}
