//! 题目存储 - 业务能力层
//!
//! 只负责"确保表存在、写入题目"，建表与行级安全策略由存储服务自己处理

use std::future::Future;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{HttpExecutor, ServiceReply};
use crate::models::question::GeneratedQuestion;

/// 写入回执
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PersistReceipt {
    #[serde(alias = "tableName")]
    pub table_name: String,
    pub inserted: usize,
}

/// 题目存储能力
pub trait QuestionStore {
    /// 幂等地确保表存在（不存在则创建）
    fn ensure_schema(&self, table_name: &str) -> impl Future<Output = AppResult<()>> + Send;

    /// 写入题目，返回实际写入的行数
    fn insert_rows(
        &self,
        table_name: &str,
        rows: &[GeneratedQuestion],
    ) -> impl Future<Output = AppResult<PersistReceipt>> + Send;
}

/// 调用存储服务的实现
///
/// - `POST {base}/ensure-schema`，body `{tableName}`
/// - `POST {base}/insert`，body `{tableName, rows}`，响应 `{table_name, inserted}`
pub struct HttpStore {
    executor: HttpExecutor,
    base_url: String,
}

impl HttpStore {
    pub fn new(executor: HttpExecutor, base_url: impl Into<String>) -> Self {
        Self {
            executor,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}", self.base_url, action)
    }
}

impl QuestionStore for HttpStore {
    async fn ensure_schema(&self, table_name: &str) -> AppResult<()> {
        let endpoint = self.endpoint("ensure-schema");
        debug!("确保存储表存在: {}", table_name);
        self.executor
            .post_json(&endpoint, &json!({ "tableName": table_name }))
            .await?;
        Ok(())
    }

    async fn insert_rows(
        &self,
        table_name: &str,
        rows: &[GeneratedQuestion],
    ) -> AppResult<PersistReceipt> {
        let endpoint = self.endpoint("insert");
        info!("💾 写入 {} 道题目到表 {}", rows.len(), table_name);
        let reply = self
            .executor
            .post_json(&endpoint, &json!({ "tableName": table_name, "rows": rows }))
            .await?;
        parse_receipt(&endpoint, reply)
    }
}

/// 解析写入回执
pub fn parse_receipt(endpoint: &str, reply: ServiceReply) -> AppResult<PersistReceipt> {
    match reply {
        ServiceReply::Json(value) => serde_json::from_value(value)
            .map_err(|e| AppError::malformed(endpoint, format!("写入回执格式不符: {}", e))),
        ServiceReply::Text(text) => Err(AppError::malformed(
            endpoint,
            format!("写入回执不是 JSON: {}", crate::utils::logging::truncate_text(&text, 80)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_receipt() {
        let receipt =
            parse_receipt("/insert", ServiceReply::Json(json!({"table_name": "light", "inserted": 60})))
                .unwrap();
        assert_eq!(
            receipt,
            PersistReceipt {
                table_name: "light".to_string(),
                inserted: 60
            }
        );
    }

    #[test]
    fn test_parse_receipt_camel_case() {
        let receipt =
            parse_receipt("/insert", ServiceReply::Json(json!({"tableName": "sound", "inserted": 3})))
                .unwrap();
        assert_eq!(receipt.table_name, "sound");
    }

    #[test]
    fn test_parse_receipt_rejects_other_shapes() {
        assert!(parse_receipt("/insert", ServiceReply::Json(json!({"ok": true}))).is_err());
        assert!(parse_receipt("/insert", ServiceReply::Text("done".to_string())).is_err());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let executor = HttpExecutor::new(std::time::Duration::from_secs(1), None).unwrap();
        let store = HttpStore::new(executor, "https://db.example/api/store/");
        assert_eq!(store.endpoint("insert"), "https://db.example/api/store/insert");
    }
}
