use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use chapter_quiz_gen::cli::{Cli, Command};
use chapter_quiz_gen::orchestrator::{App, CancelFlag, Confirmation};
use chapter_quiz_gen::utils::logging;
use chapter_quiz_gen::{Config, ProcessingOutcome};
use clap::Parser;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let mut config = Config::load().context("加载配置失败")?;
    config.verbose_logging |= cli.verbose;

    // 初始化日志
    logging::init(config.verbose_logging);

    let mode = format!("{:?}", config.generation_mode);
    let app = App::initialize(config).context("初始化失败")?;

    match cli.command {
        Command::Tree { class_name } => {
            logging::log_startup("查看课程", &mode);
            app.show_tree(&class_name).await?;
        }
        Command::Generate { scope, chapter } => {
            logging::log_startup("单章生成", &mode);
            let selection = scope.selection().with_chapter(chapter);
            match app.generate(&selection).await? {
                ProcessingOutcome::Success {
                    table_name,
                    inserted_count,
                } => info!("✅ 完成: {} 道题目 → {}", inserted_count, table_name),
                ProcessingOutcome::Failure { stage, message } => {
                    warn!("❌ 失败 [{}]: {}", stage, message)
                }
            }
        }
        Command::Bulk { scope, yes } => {
            logging::log_startup("批量生成", &mode);
            let selection = scope.selection();
            let confirmation = if yes {
                Confirmation::Confirmed
            } else {
                ask_confirmation(&selection.class_name, &scope.subject)?
            };

            let cancel = CancelFlag::new();
            let on_ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("收到 Ctrl-C，当前章节结束后停止");
                    on_ctrl_c.cancel();
                }
            });

            let report = app.bulk(&selection, confirmation, cancel).await?;
            for row in app.board().rows() {
                info!("  {:<40} {}", row.chapter_key, row.status);
            }
            if report.cancelled {
                warn!("⏹️ 批量运行被取消: {}", report.progress());
            }
        }
        Command::Normalize { class_name, message } => {
            logging::log_startup("规整课程文档", &mode);
            app.normalize(&class_name, &message).await?;
        }
    }

    Ok(())
}

/// 批量运行前的交互确认
fn ask_confirmation(class_name: &str, subject: &str) -> Result<Confirmation> {
    print!(
        "将为 {} / {} 下的所有章节调用外部服务生成题目，确认继续? [y/N] ",
        class_name, subject
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    let confirmed = matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes");
    Ok(Confirmation::from(confirmed))
}
