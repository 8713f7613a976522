//! LLM 服务 - 业务能力层
//!
//! 直接调用兼容 OpenAI 的对话接口生成章节题目，不经过生成服务
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, UpstreamError};
use crate::models::chapter::ChapterMeta;
use crate::services::generation::{
    parse_generation_reply, GenerationResult, QuestionGenerator,
};
use crate::infrastructure::ServiceReply;

const SYSTEM_MESSAGE: &str = "You are an experienced school teacher who writes multiple-choice \
quiz questions strictly grounded in the named textbook chapter. \
Respond ONLY with a JSON array, no commentary.";

/// LLM 题目生成器
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    questions_per_chapter: usize,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            questions_per_chapter: config.questions_per_chapter,
        }
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(&self, user_message: &str, system_message: Option<&str>) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(0.7)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }

    /// 构建章节出题提示词
    pub fn build_prompt(&self, meta: &ChapterMeta) -> String {
        let book_line = if meta.book.is_empty() {
            String::new()
        } else {
            format!("Book: {}\n", meta.book)
        };

        format!(
            r#"Class: {}
Subject: {}
{}Chapter: {}

Write exactly {} multiple-choice questions for this chapter.
Mix difficulties ("easy", "medium", "hard") and question types ("conceptual", "application", "scenario").
For "scenario" questions, put the short real-life situation in scenario_reason_text; otherwise omit it.

Return a JSON array where every element has exactly these keys:
difficulty, question_type, question_text, scenario_reason_text, option_a, option_b, option_c, option_d, correct_answer_key
correct_answer_key must be one of "A", "B", "C", "D"."#,
            meta.class_name, meta.subject, book_line, meta.chapter, self.questions_per_chapter
        )
    }
}

impl QuestionGenerator for LlmService {
    async fn generate(&self, meta: &ChapterMeta) -> AppResult<GenerationResult> {
        info!("🤖 LLM 出题 (模型: {}): {}", self.model_name, meta);

        let prompt = self.build_prompt(meta);
        let reply = self
            .send_to_llm(&prompt, Some(SYSTEM_MESSAGE))
            .await
            .map_err(|e| {
                AppError::Upstream(UpstreamError::Llm {
                    model: self.model_name.clone(),
                    message: e.to_string(),
                })
            })?;

        parse_generation_reply(&self.model_name, ServiceReply::Text(reply), meta)
    }
}
