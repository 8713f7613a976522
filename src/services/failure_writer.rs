//! 失败记录服务 - 业务能力层
//!
//! 只负责把失败的章节追加写入失败记录文件，方便之后重跑

use std::fs::OpenOptions;
use std::io::Write;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::chapter::ChapterMeta;
use crate::models::status::Stage;

/// 失败记录服务
pub struct FailureWriter {
    failure_file_path: String,
}

impl FailureWriter {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            failure_file_path: path.into(),
        }
    }

    /// 写入一条失败记录
    ///
    /// 格式：`年级 | 科目 | 书本 | 章节 | 阶段 | 信息`
    pub fn write(&self, meta: &ChapterMeta, stage: Stage, message: &str) -> AppResult<()> {
        debug!("写入失败记录: {} ({})", meta, stage);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.failure_file_path)
            .map_err(|e| AppError::file(&self.failure_file_path, e))?;

        let line = format!(
            "{} | {} | {} | {} | {} | {}\n",
            meta.class_name,
            meta.subject,
            meta.book,
            meta.chapter,
            stage,
            message.replace('\n', " ")
        );

        file.write_all(line.as_bytes())
            .map_err(|e| AppError::file(&self.failure_file_path, e))
    }
}
