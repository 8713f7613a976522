//! 课程树
//!
//! 一个年级一份文档：科目 → 章节列表，或 科目 → 书本 → 章节列表。

use crate::error::{AppError, AppResult};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::marker::PhantomData;

/// 章节
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub chapter_title: String,
}

impl Chapter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            chapter_title: title.into(),
        }
    }

    /// 状态表使用的稳定键
    pub fn key(&self) -> String {
        crate::utils::chapter_key(&self.chapter_title)
    }
}

/// 科目下的内容：直接是章节列表，或按书本分组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubjectEntry {
    Chapters(Vec<Chapter>),
    #[serde(deserialize_with = "deserialize_unique_keys")]
    Books(BTreeMap<String, Vec<Chapter>>),
}

/// 科目的层级形态，供调用方决定是否需要选择书本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeShape {
    /// 科目 → 章节
    Flat,
    /// 科目 → 书本 → 章节
    Books,
}

impl std::fmt::Display for TreeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeShape::Flat => write!(f, "章节列表"),
            TreeShape::Books => write!(f, "书本/章节"),
        }
    }
}

/// 一个年级的课程树
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurriculumTree {
    #[serde(deserialize_with = "deserialize_unique_keys")]
    subjects: BTreeMap<String, SubjectEntry>,
}

impl CurriculumTree {
    /// 解析严格 JSON 并校验章节标题唯一
    pub fn from_json(text: &str) -> AppResult<Self> {
        let tree: CurriculumTree = serde_json::from_str(text)
            .map_err(|e| AppError::parse(format!("课程文档结构不符: {}", e)))?;
        tree.validate()?;
        Ok(tree)
    }

    fn validate(&self) -> AppResult<()> {
        for (subject, entry) in &self.subjects {
            match entry {
                SubjectEntry::Chapters(chapters) => check_unique_titles(subject, chapters)?,
                SubjectEntry::Books(books) => {
                    for (book, chapters) in books {
                        check_unique_titles(&format!("{} / {}", subject, book), chapters)?;
                    }
                }
            }
        }
        Ok(())
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
    }

    pub fn shape(&self, subject: &str) -> Option<TreeShape> {
        self.subjects.get(subject).map(|entry| match entry {
            SubjectEntry::Chapters(_) => TreeShape::Flat,
            SubjectEntry::Books(_) => TreeShape::Books,
        })
    }

    /// 科目下的书本（扁平科目返回空列表）
    pub fn books(&self, subject: &str) -> AppResult<Vec<&str>> {
        match self.entry(subject)? {
            SubjectEntry::Chapters(_) => Ok(Vec::new()),
            SubjectEntry::Books(books) => Ok(books.keys().map(String::as_str).collect()),
        }
    }

    /// 按选择返回章节列表
    ///
    /// 扁平科目不能指定书本；分书科目必须指定书本。
    pub fn chapters(&self, subject: &str, book: Option<&str>) -> AppResult<&[Chapter]> {
        match (self.entry(subject)?, book) {
            (SubjectEntry::Chapters(chapters), None) => Ok(chapters.as_slice()),
            (SubjectEntry::Chapters(_), Some(book)) => Err(AppError::invalid_input(format!(
                "科目 {} 没有书本层级，不能选择书本 {}",
                subject, book
            ))),
            (SubjectEntry::Books(books), Some(book)) => books
                .get(book)
                .map(Vec::as_slice)
                .ok_or_else(|| {
                    AppError::invalid_input(format!("科目 {} 下没有书本 {}", subject, book))
                }),
            (SubjectEntry::Books(_), None) => Err(AppError::invalid_input(format!(
                "科目 {} 按书本分组，需要选择书本",
                subject
            ))),
        }
    }

    fn entry(&self, subject: &str) -> AppResult<&SubjectEntry> {
        self.subjects
            .get(subject)
            .ok_or_else(|| AppError::invalid_input(format!("未知科目: {}", subject)))
    }
}

/// 反序列化为 `BTreeMap`，键重复时报错而不是静默覆盖
fn deserialize_unique_keys<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct UniqueKeys<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for UniqueKeys<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("an object with unique keys")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format!("键重复: {}", key)));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueKeys(PhantomData))
}

fn check_unique_titles(scope: &str, chapters: &[Chapter]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for chapter in chapters {
        if !seen.insert(chapter.chapter_title.as_str()) {
            return Err(AppError::parse(format!(
                "{} 中章节标题重复: {}",
                scope, chapter.chapter_title
            )));
        }
    }
    Ok(())
}
