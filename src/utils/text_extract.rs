//! 文本规整工具
//!
//! - 去掉课程脚本文件外层的导出 / 赋值语法，只留下数据字面量
//! - 从 LLM 的原始文本回复中找出内嵌的 JSON

use regex::Regex;
use std::sync::OnceLock;

fn wrapper_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:export\s+default\s+|module\.exports\s*=\s*|(?:export\s+)?(?:const|let|var)\s+[A-Za-z_$][\w$]*\s*=\s*|window\.[A-Za-z_$][\w$]*\s*=\s*)",
        )
        .expect("static regex")
    })
}

fn fenced_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json|JSON)?\s*(.*?)```").expect("static regex"))
}

/// 去掉已知的脚本包装语法
///
/// 只做文本层面的剥离，结果仍需按严格 JSON 解析。
pub fn strip_script_wrapper(text: &str) -> &str {
    let text = text.trim_start_matches('\u{feff}');
    let body = match wrapper_prefix().find(text) {
        Some(m) => &text[m.end()..],
        None => text,
    };
    body.trim().trim_end_matches(';').trim_end()
}

/// 从原始文本中提取内嵌的 JSON 片段
///
/// 优先取第一个 ``` 代码块，否则取第一个 `[` / `{` 到最后一个对应闭合符号之间的内容。
pub fn extract_embedded_json(text: &str) -> Option<&str> {
    if let Some(caps) = fenced_block().captures(text) {
        let inner = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
        if !inner.is_empty() {
            return Some(inner);
        }
    }

    let start = text.find(|c: char| c == '[' || c == '{')?;
    let close = if text[start..].starts_with('[') { ']' } else { '}' };
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}
