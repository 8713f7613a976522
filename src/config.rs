use crate::error::{AppError, AppResult};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// 题目生成方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// 调用生成服务（POST `{meta}`）
    Endpoint,
    /// 直接调用兼容 OpenAI 的对话接口
    Llm,
}

impl GenerationMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "endpoint" => Some(GenerationMode::Endpoint),
            "llm" => Some(GenerationMode::Llm),
            _ => None,
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 课程文档来源模板，`{class}` 会被替换为年级
    ///
    /// 支持本地路径、`http(s)://` 地址以及 `repo:<path>`（经代码托管接口读取）
    pub curriculum_source: String,
    /// 题目生成方式
    pub generation_mode: GenerationMode,
    /// 生成服务地址
    pub generation_url: String,
    /// 存储服务地址（`/ensure-schema` 与 `/insert` 挂在其下）
    pub persistence_url: String,
    /// 转发给生成 / 存储服务的静态密钥
    pub service_key: String,
    /// 每个章节生成的题目数量（仅 LLM 模式）
    pub questions_per_chapter: usize,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 运行日志文件
    pub output_log_file: String,
    /// 失败章节记录文件
    pub failure_log_file: String,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    // --- 代码托管配置 ---
    pub repo_api_base_url: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub repo_branch: String,
    pub repo_token: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            curriculum_source: "curriculum/class-{class}.json".to_string(),
            generation_mode: GenerationMode::Endpoint,
            generation_url: "http://localhost:3000/api/generate".to_string(),
            persistence_url: "http://localhost:3000/api/store".to_string(),
            service_key: String::new(),
            questions_per_chapter: 60,
            request_timeout_secs: 120,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            failure_log_file: "failed.txt".to_string(),
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            repo_api_base_url: "https://api.github.com".to_string(),
            repo_owner: String::new(),
            repo_name: String::new(),
            repo_branch: "main".to_string(),
            repo_token: String::new(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → `QUIZGEN_CONFIG` 指向的 TOML 文件 → 环境变量
    pub fn load() -> AppResult<Self> {
        let base = match std::env::var("QUIZGEN_CONFIG") {
            Ok(path) => Self::from_toml_file(&path)?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env_overrides())
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file(path.display().to_string(), e))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        info!("已加载配置文件: {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(e.to_string()))
    }

    /// 仅使用默认值与环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    fn with_env_overrides(self) -> Self {
        Self {
            curriculum_source: env_string("CURRICULUM_SOURCE").unwrap_or(self.curriculum_source),
            generation_mode: env_string("GENERATION_MODE")
                .and_then(|v| GenerationMode::parse(&v))
                .unwrap_or(self.generation_mode),
            generation_url: env_string("GENERATION_URL").unwrap_or(self.generation_url),
            persistence_url: env_string("PERSISTENCE_URL").unwrap_or(self.persistence_url),
            service_key: env_string("SERVICE_KEY").unwrap_or(self.service_key),
            questions_per_chapter: env_parsed("QUESTIONS_PER_CHAPTER").unwrap_or(self.questions_per_chapter),
            request_timeout_secs: env_parsed("REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            verbose_logging: env_parsed("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: env_string("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
            failure_log_file: env_string("FAILURE_LOG_FILE").unwrap_or(self.failure_log_file),
            llm_api_key: env_string("LLM_API_KEY").unwrap_or(self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            repo_api_base_url: env_string("REPO_API_BASE_URL").unwrap_or(self.repo_api_base_url),
            repo_owner: env_string("REPO_OWNER").unwrap_or(self.repo_owner),
            repo_name: env_string("REPO_NAME").unwrap_or(self.repo_name),
            repo_branch: env_string("REPO_BRANCH").unwrap_or(self.repo_branch),
            repo_token: env_string("REPO_TOKEN").unwrap_or(self.repo_token),
        }
    }

    /// 静态密钥为空时不转发
    pub fn service_key(&self) -> Option<&str> {
        Some(self.service_key.as_str()).filter(|k| !k.is_empty())
    }

    /// 是否配置了代码托管仓库
    pub fn has_repo(&self) -> bool {
        !self.repo_owner.is_empty() && !self.repo_name.is_empty()
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}
