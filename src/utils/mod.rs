pub mod logging;
pub mod slug;
pub mod text_extract;

pub use slug::{chapter_key, slug, table_name_for};
