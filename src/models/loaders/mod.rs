pub mod curriculum_loader;

pub use curriculum_loader::{parse_curriculum, CurriculumLoader, CurriculumSource};
