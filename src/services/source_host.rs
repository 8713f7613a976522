//! 代码托管客户端 - 业务能力层
//!
//! 通过 contents 接口读取 / 更新仓库中的单个文件

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{AppError, AppResult, UpstreamError};
use crate::infrastructure::{http_executor::read_reply, ServiceReply};

/// 仓库中的文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoFile {
    pub path: String,
    /// blob sha，更新时必须带上
    pub sha: String,
    pub content: String,
}

#[derive(Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

/// 代码托管客户端
pub struct SourceHostClient {
    client: reqwest::Client,
    api_base_url: String,
    owner: String,
    repo: String,
    branch: String,
    token: Option<String>,
}

impl SourceHostClient {
    pub fn new(config: &Config) -> AppResult<Self> {
        if !config.has_repo() {
            return Err(AppError::Config(
                "未配置 REPO_OWNER / REPO_NAME，无法访问代码托管仓库".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Config(format!("无法创建 HTTP 客户端: {}", e)))?;

        Ok(Self {
            client,
            api_base_url: config.repo_api_base_url.trim_end_matches('/').to_string(),
            owner: config.repo_owner.clone(),
            repo: config.repo_name.clone(),
            branch: config.repo_branch.clone(),
            token: Some(config.repo_token.clone()).filter(|t| !t.is_empty()),
        })
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base_url,
            self.owner,
            self.repo,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/vnd.github+json")
            .header(USER_AGENT, "chapter-quiz-gen");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    /// 读取文件
    pub async fn fetch_file(&self, path: &str) -> AppResult<RepoFile> {
        let url = self.contents_url(path);
        debug!("读取仓库文件: {}", url);

        let response = self
            .request(reqwest::Method::GET, &url)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Fetch {
                url: url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Fetch {
                url,
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let body: ContentsResponse = response
            .json()
            .await
            .map_err(|e| AppError::malformed(url.as_str(), e.to_string()))?;

        if body.encoding != "base64" {
            return Err(AppError::malformed(
                url.as_str(),
                format!("不支持的内容编码: {:?}", body.encoding),
            ));
        }

        Ok(RepoFile {
            path: body.path,
            sha: body.sha,
            content: decode_content(&body.content)
                .map_err(|message| AppError::malformed(url.as_str(), message))?,
        })
    }

    /// 更新文件，返回新的 blob sha
    pub async fn update_file(&self, file: &RepoFile, new_content: &str, message: &str) -> AppResult<String> {
        let url = self.contents_url(&file.path);
        info!("📤 提交仓库文件: {} ({})", file.path, message);

        let body = build_update_body(new_content, &file.sha, &self.branch, message);
        let response = self
            .request(reqwest::Method::PUT, &url)
            .json(&body)
            .send()
            .await
            .map_err(|e| UpstreamError::RequestFailed {
                endpoint: url.clone(),
                source: e,
            })?;

        let reply = read_reply(&url, response).await?;

        match reply {
            ServiceReply::Json(value) => value
                .pointer("/content/sha")
                .and_then(JsonValue::as_str)
                .map(str::to_string)
                .ok_or_else(|| AppError::malformed(url.as_str(), "响应中缺少 content.sha")),
            ServiceReply::Text(_) => {
                Err(AppError::malformed(url.as_str(), "响应不是 JSON"))
            }
        }
    }
}

/// 解码 contents 接口返回的 base64（带换行）
pub fn decode_content(encoded: &str) -> Result<String, String> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| format!("base64 解码失败: {}", e))?;
    String::from_utf8(bytes).map_err(|e| format!("文件不是 UTF-8: {}", e))
}

/// 构建更新请求体
pub fn build_update_body(content: &str, sha: &str, branch: &str, message: &str) -> JsonValue {
    json!({
        "message": message,
        "content": STANDARD.encode(content),
        "sha": sha,
        "branch": branch,
    })
}
