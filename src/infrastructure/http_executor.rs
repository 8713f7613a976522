//! HTTP 执行器 - 基础设施层
//!
//! 持有唯一的 `reqwest::Client`，只暴露"发请求、判断成败"的能力

use crate::error::{AppError, AppResult, UpstreamError};
use crate::utils::logging::truncate_text;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::debug;

/// 协作服务的成功响应
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceReply {
    /// 响应体是 JSON
    Json(JsonValue),
    /// 响应体是纯文本（需要调用方再提取）
    Text(String),
}

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 HTTP 客户端
/// - 转发静态密钥
/// - 把非 2xx 与 `error` 字段统一转换成 `UpstreamError`
/// - 不认识章节 / 题目
#[derive(Clone)]
pub struct HttpExecutor {
    client: reqwest::Client,
    service_key: Option<String>,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(timeout: Duration, service_key: Option<&str>) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            service_key: service_key.map(str::to_string),
        })
    }

    /// GET 文本内容（课程文档）
    ///
    /// 网络错误与非 2xx 都视为获取失败
    pub async fn get_text(&self, url: &str) -> AppResult<String> {
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| AppError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                url: url.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        response.text().await.map_err(|e| AppError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// POST JSON 到协作服务
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> AppResult<ServiceReply> {
        debug!("POST {}", url);

        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.service_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpstreamError::RequestFailed {
                endpoint: url.to_string(),
                source: e,
            })?;

        Ok(read_reply(url, response).await?)
    }
}

/// 读取响应体并按约定解释
///
/// 读取响应体失败与发送失败一样视为 `RequestFailed`
pub async fn read_reply(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<ServiceReply, UpstreamError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| UpstreamError::RequestFailed {
            endpoint: endpoint.to_string(),
            source: e,
        })?;

    debug!("响应 {} ({} 字节)", status, body.len());

    interpret_reply(endpoint, status, &body)
}

/// 按约定解释协作服务的响应
///
/// - 非 2xx：`BadStatus`，优先使用 JSON 里的 `error` 字段作为消息
/// - 2xx 且 JSON 对象带非空 `error`：`ServiceError`
/// - 2xx 且是 JSON：`ServiceReply::Json`，否则 `ServiceReply::Text`
pub fn interpret_reply(
    endpoint: &str,
    status: u16,
    body: &str,
) -> Result<ServiceReply, UpstreamError> {
    let json = serde_json::from_str::<JsonValue>(body).ok();
    let error_message = json.as_ref().and_then(error_field);

    if !(200..300).contains(&status) {
        return Err(UpstreamError::BadStatus {
            endpoint: endpoint.to_string(),
            status,
            message: error_message.unwrap_or_else(|| truncate_text(body.trim(), 200)),
        });
    }

    if let Some(message) = error_message {
        return Err(UpstreamError::ServiceError {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    Ok(match json {
        Some(value) => ServiceReply::Json(value),
        None => ServiceReply::Text(body.to_string()),
    })
}

fn error_field(value: &JsonValue) -> Option<String> {
    match value.get("error")? {
        JsonValue::Null => None,
        JsonValue::Bool(false) => None,
        JsonValue::String(s) if s.trim().is_empty() => None,
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Object(obj) => obj
            .get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_string)
            .or_else(|| Some(JsonValue::Object(obj.clone()).to_string())),
        other => Some(other.to_string()),
    }
}
