use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 缺少必填的选择字段（年级 / 科目 / 章节）
    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 外部协作服务（生成 / 存储 / 代码托管）返回错误或不可达
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// 生成服务返回了 0 道题目
    #[error("empty result")]
    EmptyResult,

    /// 课程文档无法解析为预期的树结构
    #[error("解析失败: {0}")]
    Parse(String),

    /// 课程文档获取失败
    #[error("获取失败 ({url}): {message}")]
    Fetch { url: String, message: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 批量运行未获得确认
    #[error("批量生成未确认，已取消")]
    NotConfirmed,
}

/// 外部服务调用错误
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// 非 2xx 状态码
    #[error("HTTP {status} ({endpoint}): {message}")]
    BadStatus {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// 2xx 但响应体带有 `error` 字段
    #[error("服务返回错误 ({endpoint}): {message}")]
    ServiceError { endpoint: String, message: String },

    /// 响应体形状不符合约定
    #[error("响应格式错误 ({endpoint}): {message}")]
    MalformedBody { endpoint: String, message: String },

    /// LLM 调用失败
    #[error("LLM 调用失败 (模型: {model}): {message}")]
    Llm { model: String, message: String },
}

impl AppError {
    /// 创建输入无效错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        AppError::InvalidInput(message.into())
    }

    /// 创建解析错误
    pub fn parse(message: impl Into<String>) -> Self {
        AppError::Parse(message.into())
    }

    /// 创建响应格式错误
    pub fn malformed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Upstream(UpstreamError::MalformedBody {
            endpoint: endpoint.into(),
            message: message.into(),
        })
    }

    /// 创建文件错误
    pub fn file(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
