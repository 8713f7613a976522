use serde::{Deserialize, Serialize};

/// 生成的一道题目
///
/// 编排层不解读字段内容，只看题目数量和整体形状。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub difficulty: String,
    #[serde(alias = "questionType", alias = "type")]
    pub question_type: String,
    #[serde(alias = "questionText", alias = "question")]
    pub question_text: String,
    #[serde(
        default,
        alias = "scenarioReasonText",
        skip_serializing_if = "Option::is_none"
    )]
    pub scenario_reason_text: Option<String>,
    #[serde(alias = "optionA", deserialize_with = "deserialize_lenient_string")]
    pub option_a: String,
    #[serde(alias = "optionB", deserialize_with = "deserialize_lenient_string")]
    pub option_b: String,
    #[serde(alias = "optionC", deserialize_with = "deserialize_lenient_string")]
    pub option_c: String,
    #[serde(alias = "optionD", deserialize_with = "deserialize_lenient_string")]
    pub option_d: String,
    #[serde(alias = "correctAnswerKey", alias = "answer")]
    pub correct_answer_key: String,
}

/// 一个章节的题目集合
pub type GeneratedQuestionSet = Vec<GeneratedQuestion>;

// LLM 偶尔把难度或选项写成数字，统一收成字符串
fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Visitor;
    use std::fmt;

    struct LenientVisitor;

    impl<'de> Visitor<'de> for LenientVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string or number")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(LenientVisitor)
}
