//! 命令行定义

use clap::{Args, Parser, Subcommand};

use crate::models::chapter::SelectionState;

#[derive(Parser, Debug)]
#[command(name = "chapter-quiz-gen", version, about = "按课程章节生成并保存选择题")]
pub struct Cli {
    /// 显示详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 查看一个年级的课程树
    Tree {
        #[arg(long = "class")]
        class_name: String,
    },
    /// 为单个章节生成并保存题目
    Generate {
        #[command(flatten)]
        scope: ScopeArgs,
        #[arg(long)]
        chapter: String,
    },
    /// 为范围内的所有章节生成并保存题目
    Bulk {
        #[command(flatten)]
        scope: ScopeArgs,
        /// 跳过交互确认
        #[arg(short, long)]
        yes: bool,
    },
    /// 把仓库中的课程文档改写为严格 JSON
    Normalize {
        #[arg(long = "class")]
        class_name: String,
        #[arg(long, default_value = "Normalize curriculum document to plain JSON")]
        message: String,
    },
}

/// 年级 / 科目 / 书本
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    #[arg(long = "class")]
    pub class_name: String,
    #[arg(long)]
    pub subject: String,
    /// 分书科目必填
    #[arg(long)]
    pub book: Option<String>,
}

impl ScopeArgs {
    pub fn selection(&self) -> SelectionState {
        SelectionState::new(&self.class_name)
            .with_subject(&self.subject)
            .with_book(self.book.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "chapter-quiz-gen",
            "generate",
            "--class",
            "6",
            "--subject",
            "Science",
            "--chapter",
            "Light",
        ]);
        match cli.command {
            Command::Generate { scope, chapter } => {
                let selection = scope.selection().with_chapter(chapter);
                assert_eq!(selection.class_name, "6");
                assert_eq!(selection.subject.as_deref(), Some("Science"));
                assert_eq!(selection.book, None);
                assert_eq!(selection.chapter.as_deref(), Some("Light"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_bulk_with_book() {
        let cli = Cli::parse_from([
            "chapter-quiz-gen",
            "-v",
            "bulk",
            "--class",
            "7",
            "--subject",
            "English",
            "--book",
            "Honeycomb",
            "--yes",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Bulk { scope, yes } => {
                assert!(yes);
                assert_eq!(scope.selection().book.as_deref(), Some("Honeycomb"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
