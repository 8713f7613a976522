use crate::error::{AppError, AppResult};
use crate::infrastructure::HttpExecutor;
use crate::models::curriculum::CurriculumTree;
use crate::services::SourceHostClient;
use crate::utils::text_extract::strip_script_wrapper;
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

/// 课程文档来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurriculumSource {
    /// 本地文件
    File(PathBuf),
    /// 静态地址或仓库 raw 地址
    Url(String),
    /// 经代码托管 contents 接口读取的仓库路径
    Repo(String),
}

impl CurriculumSource {
    /// 由模板解析来源，`{class}` 替换为年级
    pub fn resolve(template: &str, class_name: &str) -> Self {
        let location = template.replace("{class}", class_name);
        if let Some(path) = location.strip_prefix("repo:") {
            CurriculumSource::Repo(path.to_string())
        } else if location.starts_with("http://") || location.starts_with("https://") {
            CurriculumSource::Url(location)
        } else {
            CurriculumSource::File(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for CurriculumSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurriculumSource::File(path) => write!(f, "{}", path.display()),
            CurriculumSource::Url(url) => write!(f, "{}", url),
            CurriculumSource::Repo(path) => write!(f, "repo:{}", path),
        }
    }
}

/// 把文档文本规整为课程树
///
/// 先剥掉脚本包装，再按严格 JSON 解析；绝不执行文本
pub fn parse_curriculum(text: &str) -> AppResult<CurriculumTree> {
    let body = strip_script_wrapper(text);
    if body.is_empty() {
        return Err(AppError::parse("课程文档为空"));
    }
    CurriculumTree::from_json(body)
}

/// 课程加载器
pub struct CurriculumLoader<'a> {
    template: String,
    http: &'a HttpExecutor,
    source_host: Option<&'a SourceHostClient>,
}

impl<'a> CurriculumLoader<'a> {
    pub fn new(
        template: impl Into<String>,
        http: &'a HttpExecutor,
        source_host: Option<&'a SourceHostClient>,
    ) -> Self {
        Self {
            template: template.into(),
            http,
            source_host,
        }
    }

    /// 读取原始文本
    pub async fn fetch_text(&self, source: &CurriculumSource) -> AppResult<String> {
        match source {
            CurriculumSource::File(path) => {
                fs::read_to_string(path).await.map_err(|e| AppError::Fetch {
                    url: path.display().to_string(),
                    message: e.to_string(),
                })
            }
            CurriculumSource::Url(url) => self.http.get_text(url).await,
            CurriculumSource::Repo(path) => {
                let client = self.source_host.ok_or_else(|| {
                    AppError::Config(format!("来源 repo:{} 需要配置代码托管仓库", path))
                })?;
                Ok(client.fetch_file(path).await?.content)
            }
        }
    }

    /// 加载一个年级的课程树
    pub async fn load(&self, class_name: &str) -> AppResult<CurriculumTree> {
        let source = CurriculumSource::resolve(&self.template, class_name);
        info!("📚 正在加载课程: {}", source);

        let text = self.fetch_text(&source).await?;
        let tree = parse_curriculum(&text)?;

        info!("✓ 课程加载完成，共 {} 个科目", tree.subjects().count());
        Ok(tree)
    }
}
