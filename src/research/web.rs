//! 网页检索：DuckDuckGo Instant Answer 搜索 + 单页抓取
//!
//! search_web 在主题后追加时效/地域后缀再查询，把摘要与相关主题拼成一块文本；
//! scrape_url / deep_scrape 抓取单页、提取可读文本并截断，避免撑爆下游提示词。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::ResearchSection;
use crate::research::text::{collapse_whitespace, page_text, truncate_chars};
use crate::research::{Research, Researcher, ScrapeError, SearchError};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

pub struct WebResearcher {
    client: Client,
    search_endpoint: String,
    query_suffix: String,
    max_results: usize,
    scrape_max_chars: usize,
    deep_scrape_max_chars: usize,
}

impl WebResearcher {
    pub fn new(config: &ResearchSection) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            search_endpoint: config.search_endpoint.clone(),
            query_suffix: config.query_suffix.clone(),
            max_results: config.max_results,
            scrape_max_chars: config.scrape_max_chars,
            deep_scrape_max_chars: config.deep_scrape_max_chars,
        }
    }

    /// 主题 + 固定后缀
    pub fn enhanced_query(&self, topic: &str) -> String {
        let topic = topic.trim();
        if self.query_suffix.trim().is_empty() {
            topic.to_string()
        } else {
            format!("{} {}", topic, self.query_suffix.trim())
        }
    }

    async fn query(&self, query: &str) -> Result<String, SearchError> {
        let response = self
            .client
            .get(&self.search_endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| SearchError::new(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::new(format!("HTTP {}", status)));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| SearchError::new(format!("invalid response: {}", e)))?;

        Ok(summarize_results(&data, self.max_results))
    }

    /// 取回页面可读文本；失败时只返回原因，由调用方加前缀
    async fn fetch_page(&self, url: &str) -> Result<String, String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        let body = resp.text().await.map_err(|e| format!("read body: {}", e))?;
        Ok(page_text(&body))
    }

    /// 抓取单页正文，截断到 scrape_max_chars
    pub async fn scrape_url(&self, url: &str) -> Result<String, ScrapeError> {
        tracing::info!(url = %url, "scraping page");
        let text = self.fetch_page(url).await.map_err(|message| ScrapeError::Page {
            url: url.to_string(),
            message,
        })?;
        Ok(truncate_chars(&text, self.scrape_max_chars))
    }

    /// 抓取单页正文，折叠空白后截断到 deep_scrape_max_chars
    pub async fn deep_scrape(&self, url: &str) -> Result<String, ScrapeError> {
        tracing::info!(url = %url, "deep scraping page");
        let text = self.fetch_page(url).await.map_err(|message| ScrapeError::Deep {
            url: url.to_string(),
            message,
        })?;
        Ok(truncate_chars(&collapse_whitespace(&text), self.deep_scrape_max_chars))
    }
}

/// 把 Instant Answer JSON 拼成一块文本：标题/摘要在前，相关主题逐条在后
fn summarize_results(data: &Value, max_results: usize) -> String {
    let mut lines: Vec<String> = Vec::new();

    let heading = data.get("Heading").and_then(Value::as_str).unwrap_or("");
    let abstract_text = data.get("AbstractText").and_then(Value::as_str).unwrap_or("");
    if !abstract_text.is_empty() {
        let source = data.get("AbstractURL").and_then(Value::as_str).unwrap_or("");
        let title = if heading.is_empty() { "Result" } else { heading };
        if source.is_empty() {
            lines.push(format!("{}: {}", title, abstract_text));
        } else {
            lines.push(format!("{}: {} ({})", title, abstract_text, source));
        }
    }

    if let Some(answer) = data.get("Answer").and_then(Value::as_str) {
        if !answer.is_empty() {
            lines.push(answer.to_string());
        }
    }

    let mut topics: Vec<&Value> = Vec::new();
    if let Some(related) = data.get("RelatedTopics").and_then(Value::as_array) {
        for topic in related {
            // 分组主题嵌套在 Topics 下
            match topic.get("Topics").and_then(Value::as_array) {
                Some(group) => topics.extend(group.iter()),
                None => topics.push(topic),
            }
        }
    }
    for topic in topics {
        if lines.len() >= max_results {
            break;
        }
        if let Some(text) = topic.get("Text").and_then(Value::as_str) {
            if text.is_empty() {
                continue;
            }
            match topic.get("FirstURL").and_then(Value::as_str) {
                Some(url) if !url.is_empty() => lines.push(format!("- {} ({})", text, url)),
                _ => lines.push(format!("- {}", text)),
            }
        }
    }

    if lines.is_empty() {
        "No search results found.".to_string()
    } else {
        lines.join("\n")
    }
}

#[async_trait]
impl Researcher for WebResearcher {
    async fn search_web(&self, topic: &str) -> Research {
        let query = self.enhanced_query(topic);
        tracing::info!(query = %query, "searching web");
        let result = self.query(&query).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "search failed");
        }
        result
    }
}
