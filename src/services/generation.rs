//! 题目生成 - 业务能力层
//!
//! 只负责"根据章节元数据拿到一组题目"，不关心存储和流程

use std::future::Future;

use serde_json::{json, Value as JsonValue};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{HttpExecutor, ServiceReply};
use crate::models::chapter::ChapterMeta;
use crate::models::question::GeneratedQuestionSet;
use crate::utils::table_name_for;
use crate::utils::text_extract::extract_embedded_json;

/// 生成结果
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    /// 建议的存储表名（与 slug 推导一致）
    pub table_name: String,
    pub questions: GeneratedQuestionSet,
}

/// 题目生成能力
pub trait QuestionGenerator {
    fn generate(&self, meta: &ChapterMeta) -> impl Future<Output = AppResult<GenerationResult>> + Send;
}

/// 调用生成服务的实现：POST `{meta}`
pub struct HttpGenerator {
    executor: HttpExecutor,
    endpoint: String,
}

impl HttpGenerator {
    pub fn new(executor: HttpExecutor, endpoint: impl Into<String>) -> Self {
        Self {
            executor,
            endpoint: endpoint.into(),
        }
    }
}

impl QuestionGenerator for HttpGenerator {
    async fn generate(&self, meta: &ChapterMeta) -> AppResult<GenerationResult> {
        info!("🤖 请求生成服务: {}", meta);
        let reply = self
            .executor
            .post_json(&self.endpoint, &json!({ "meta": meta }))
            .await?;
        parse_generation_reply(&self.endpoint, reply, meta)
    }
}

/// 解析生成服务的响应
///
/// 接受以下形状：
/// - `{"questions": [...], "table_name"?: "..."}`
/// - `[...]`
/// - `{"text" | "content" | "output": "..."}` 或纯文本，其中内嵌 JSON
pub fn parse_generation_reply(
    endpoint: &str,
    reply: ServiceReply,
    meta: &ChapterMeta,
) -> AppResult<GenerationResult> {
    let value = match reply {
        ServiceReply::Json(value) => value,
        ServiceReply::Text(text) => parse_embedded(endpoint, &text)?,
    };

    let value = match embedded_text(&value) {
        Some(text) => parse_embedded(endpoint, text)?,
        None => value,
    };

    let suggested = value
        .get("table_name")
        .or_else(|| value.get("tableName"))
        .and_then(JsonValue::as_str)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string);

    let questions = match value {
        JsonValue::Array(_) => value,
        JsonValue::Object(mut obj) => obj.remove("questions").ok_or_else(|| {
            AppError::malformed(endpoint, "响应中缺少 questions 字段")
        })?,
        other => {
            return Err(AppError::malformed(
                endpoint,
                format!("无法识别的响应: {}", other),
            ))
        }
    };

    let questions: GeneratedQuestionSet = serde_json::from_value(questions)
        .map_err(|e| AppError::malformed(endpoint, format!("题目格式不符: {}", e)))?;

    debug!("解析到 {} 道题目", questions.len());

    Ok(GenerationResult {
        table_name: suggested.unwrap_or_else(|| table_name_for(&meta.chapter)),
        questions,
    })
}

fn embedded_text(value: &JsonValue) -> Option<&str> {
    if value.get("questions").is_some() {
        return None;
    }
    ["text", "content", "output"]
        .iter()
        .find_map(|key| value.get(*key).and_then(JsonValue::as_str))
}

/// 从原始文本中提取 JSON（LLM 回复同样走这里）
pub fn parse_embedded(endpoint: &str, text: &str) -> AppResult<JsonValue> {
    let fragment = extract_embedded_json(text)
        .ok_or_else(|| AppError::malformed(endpoint, "响应文本中没有找到 JSON"))?;
    serde_json::from_str(fragment)
        .map_err(|e| AppError::malformed(endpoint, format!("内嵌 JSON 无法解析: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;

    fn meta(chapter: &str) -> ChapterMeta {
        ChapterMeta {
            class_name: "6".to_string(),
            subject: "Science".to_string(),
            book: String::new(),
            chapter: chapter.to_string(),
        }
    }

    fn question_json() -> JsonValue {
        json!({
            "difficulty": "easy",
            "question_type": "conceptual",
            "question_text": "What travels in a straight line?",
            "option_a": "Light", "option_b": "Sound", "option_c": "Heat", "option_d": "None",
            "correct_answer_key": "A"
        })
    }

    #[test]
    fn test_questions_object_with_derived_table() {
        let reply = ServiceReply::Json(json!({ "questions": [question_json(), question_json()] }));
        let result = parse_generation_reply("/gen", reply, &meta("Light and Shadows")).unwrap();
        assert_eq!(result.table_name, "light_and_shadows");
        assert_eq!(result.questions.len(), 2);
    }

    #[test]
    fn test_suggested_table_name_wins() {
        let reply = ServiceReply::Json(json!({ "table_name": "class6_light", "questions": [] }));
        let result = parse_generation_reply("/gen", reply, &meta("Light")).unwrap();
        assert_eq!(result.table_name, "class6_light");
        assert!(result.questions.is_empty());
    }

    #[test]
    fn test_raw_text_payload() {
        let text = format!("Here are your questions:\n```json\n{}\n```", json!([question_json()]));
        let result =
            parse_generation_reply("/gen", ServiceReply::Text(text), &meta("Light")).unwrap();
        assert_eq!(result.table_name, "light");
        assert_eq!(result.questions.len(), 1);
    }

    #[test]
    fn test_text_field_payload() {
        let reply = ServiceReply::Json(json!({ "text": json!([question_json()]).to_string() }));
        let result = parse_generation_reply("/gen", reply, &meta("Light")).unwrap();
        assert_eq!(result.questions.len(), 1);
    }

    #[test]
    fn test_malformed_bodies() {
        let cases = vec![
            ServiceReply::Text("sorry, I cannot help".to_string()),
            ServiceReply::Json(json!({ "result": "ok" })),
            ServiceReply::Json(json!({ "questions": [{ "question_text": "?" }] })),
            ServiceReply::Json(json!(42)),
        ];
        for reply in cases {
            let err = parse_generation_reply("/gen", reply, &meta("Light")).unwrap_err();
            assert!(
                matches!(err, AppError::Upstream(UpstreamError::MalformedBody { .. })),
                "{:?}",
                err
            );
        }
    }
}
