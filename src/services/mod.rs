pub mod failure_writer;
pub mod generation;
pub mod llm_service;
pub mod reporter;
pub mod source_host;
pub mod store;

pub use failure_writer::FailureWriter;
pub use generation::{GenerationResult, HttpGenerator, QuestionGenerator};
pub use llm_service::LlmService;
pub use reporter::{
    LogFileReporter, MultiReporter, Progress, ReportEvent, Severity, StatusBoard, StatusReporter,
    TracingReporter,
};
pub use source_host::{RepoFile, SourceHostClient};
pub use store::{HttpStore, PersistReceipt, QuestionStore};
