//! 章节处理上下文
//!
//! 封装"我正在处理第几个章节、它的键是什么"这一信息

use std::fmt::Display;

use crate::models::chapter::ChapterMeta;

/// 章节处理上下文
#[derive(Debug, Clone)]
pub struct ChapterCtx {
    /// 在批次中的序号（从1开始）
    pub index: usize,

    /// 批次总数（单章处理时为 1）
    pub total: usize,

    /// 章节键（slug，标题无可用字符时为原标题）
    pub key: String,
}

impl ChapterCtx {
    pub fn new(index: usize, total: usize, meta: &ChapterMeta) -> Self {
        Self {
            index,
            total,
            key: meta.key(),
        }
    }

    /// 单章处理
    pub fn single(meta: &ChapterMeta) -> Self {
        Self::new(1, 1, meta)
    }
}

impl Display for ChapterCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[章节 {}/{} {}]", self.index, self.total, self.key)
    }
}
