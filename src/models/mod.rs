pub mod chapter;
pub mod curriculum;
pub mod loaders;
pub mod question;
pub mod status;

pub use chapter::{ChapterMeta, SelectionState};
pub use curriculum::{Chapter, CurriculumTree, SubjectEntry, TreeShape};
pub use loaders::{CurriculumLoader, CurriculumSource};
pub use question::{GeneratedQuestion, GeneratedQuestionSet};
pub use status::{ProcessingOutcome, ProcessingStatus, Stage};
