//! 章节标题 → 标识符
//!
//! slug 同时用作状态表的键和存储表名的来源，必须是确定性的。

use regex::Regex;
use std::sync::OnceLock;

fn non_alphanumeric_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// 生成章节 slug
///
/// 转小写，把每一段非 `[a-z0-9]` 字符替换为单个 `-`，再去掉首尾的 `-`。
pub fn slug(title: &str) -> String {
    let lowered = title.to_lowercase();
    non_alphanumeric_run()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// 章节键：优先用 slug；标题里没有 `[a-z0-9]` 时退回去掉首尾空白的原标题
///
/// 同一序列内标题唯一，所以键也唯一。
pub fn chapter_key(title: &str) -> String {
    let key = slug(title);
    if key.is_empty() {
        title.trim().to_string()
    } else {
        key
    }
}

/// 由章节标题推导存储表名（slug 中的 `-` 换成 `_`）
pub fn table_name_for(title: &str) -> String {
    slug(title).replace('-', "_")
}
