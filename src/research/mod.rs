//! 检索协作者：一次尽力而为的网页搜索，以及单页抓取
//!
//! 失败不向上抛：以 SearchError / ScrapeError 返回，Display 即内联错误文本，
//! 仍可作为 searchData 流入起草提示词。无重试、无去重、无排序。

pub mod text;
pub mod web;

use async_trait::async_trait;
use thiserror::Error;

pub use web::WebResearcher;

/// 一次搜索的结果：文本块或失败详情
pub type Research = Result<String, SearchError>;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("Search Error: {message}")]
pub struct SearchError {
    pub message: String,
}

impl SearchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// 单页抓取失败；两种抓取各有前缀
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScrapeError {
    /// scrape_url
    #[error("Error scraping {url}: {message}")]
    Page { url: String, message: String },
    /// deep_scrape
    #[error("Scraping Error for {url}: {message}")]
    Deep { url: String, message: String },
}

/// 检索 trait：给定主题返回一块文本
#[async_trait]
pub trait Researcher: Send + Sync {
    async fn search_web(&self, topic: &str) -> Research;
}
