//! 章节元数据与选择状态

use crate::error::{AppError, AppResult};
use crate::models::curriculum::{Chapter, CurriculumTree};
use serde::{Deserialize, Serialize};

/// 一次处理所需的章节元数据，原样传给生成与存储服务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterMeta {
    pub class_name: String,
    pub subject: String,
    /// 无书本层级时为空字符串
    #[serde(default)]
    pub book: String,
    pub chapter: String,
}

impl ChapterMeta {
    /// 同一范围内换一个章节
    pub fn for_chapter(&self, chapter: &Chapter) -> Self {
        Self {
            chapter: chapter.chapter_title.clone(),
            ..self.clone()
        }
    }

    /// 校验必填字段
    pub fn validate(&self) -> AppResult<()> {
        let missing: Vec<&str> = [
            ("class_name", &self.class_name),
            ("subject", &self.subject),
            ("chapter", &self.chapter),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::invalid_input(format!(
                "缺少字段: {}",
                missing.join(", ")
            )))
        }
    }

    /// 章节键
    pub fn key(&self) -> String {
        crate::utils::chapter_key(&self.chapter)
    }
}

impl std::fmt::Display for ChapterMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.book.is_empty() {
            write!(f, "{} / {} / {}", self.class_name, self.subject, self.chapter)
        } else {
            write!(
                f,
                "{} / {} / {} / {}",
                self.class_name, self.subject, self.book, self.chapter
            )
        }
    }
}

/// 当前选择（年级 → 科目 → [书本] → 章节）
///
/// 由调用方持有并显式传递。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub class_name: String,
    pub subject: Option<String>,
    pub book: Option<String>,
    pub chapter: Option<String>,
}

impl SelectionState {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            ..Self::default()
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_book(mut self, book: Option<String>) -> Self {
        self.book = book.filter(|b| !b.is_empty());
        self
    }

    pub fn with_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }

    /// 当前范围内可选的章节
    pub fn chapters_in_scope<'t>(&self, tree: &'t CurriculumTree) -> AppResult<&'t [Chapter]> {
        let subject = self.require_subject()?;
        tree.chapters(subject, self.book.as_deref())
    }

    /// 批量运行使用的模板（章节字段留空）
    pub fn scope_template(&self) -> AppResult<ChapterMeta> {
        if self.class_name.trim().is_empty() {
            return Err(AppError::invalid_input("缺少字段: class_name"));
        }
        Ok(ChapterMeta {
            class_name: self.class_name.clone(),
            subject: self.require_subject()?.to_string(),
            book: self.book.clone().unwrap_or_default(),
            chapter: String::new(),
        })
    }

    /// 单章处理使用的元数据，章节必须存在于课程树中
    pub fn to_meta(&self, tree: &CurriculumTree) -> AppResult<ChapterMeta> {
        let title = self
            .chapter
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("缺少字段: chapter"))?;

        let chapter = self
            .chapters_in_scope(tree)?
            .iter()
            .find(|c| c.chapter_title == title)
            .ok_or_else(|| AppError::invalid_input(format!("当前范围内没有章节: {}", title)))?;

        Ok(self.scope_template()?.for_chapter(chapter))
    }

    fn require_subject(&self) -> AppResult<&str> {
        self.subject
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| AppError::invalid_input("缺少字段: subject"))
    }
}
