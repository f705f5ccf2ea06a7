//! Research Pipeline - 계획 → 검색 → 열람 → (검증) → 종합
//!
//! 루프 오케스트레이터를 거치지 않고 검색/열람 핸들러 로직을 직접
//! 소비하는 배치 절차입니다. 자체 예산(쿼리 수, 소스 수, 소스당
//! 문자 수)을 관리하고, 종합 실패 시 다이제스트를 절반으로 줄여
//! 한 번 재시도합니다. 파이프라인은 절대 빈손으로 반환하지 않습니다 -
//! 최악의 경우에도 소스 목록만이라도 돌려줍니다.

use driftwood_foundation::{Message, ResearchConfig, Result};
use driftwood_provider::{ChatClient, ChatRequest};
use driftwood_tool::builtin::{FetchPageTool, SearchHit, WebSearchTool};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 열람까지 끝난 단일 소스
#[derive(Debug, Clone)]
pub struct SourceDigest {
    pub title: String,
    pub url: String,
    pub snippet: String,

    /// HTML-to-text 결과, `per_source_chars`로 캡
    pub text: String,
}

/// 파이프라인 결과
#[derive(Debug)]
pub struct ResearchReport {
    pub topic: String,
    pub queries: Vec<String>,
    pub sources: Vec<SourceDigest>,

    /// 검증 단계의 주장/모순 메모 (verify가 켜진 경우)
    pub notes: Vec<String>,

    pub answer: String,
}

pub struct ResearchPipeline {
    client: Arc<dyn ChatClient>,
    model: String,
    search: Arc<WebSearchTool>,
    fetcher: FetchPageTool,
    config: ResearchConfig,
}

impl ResearchPipeline {
    pub fn new(
        client: Arc<dyn ChatClient>,
        model: impl Into<String>,
        search: Arc<WebSearchTool>,
        config: ResearchConfig,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            search,
            fetcher: FetchPageTool::new(),
            config,
        }
    }

    pub async fn run(&self, topic: &str) -> Result<ResearchReport> {
        let queries = self.plan(topic).await;
        info!(topic, queries = queries.len(), "Research plan ready");

        let hits = self.search_all(&queries).await;
        let sources = self.open_sources(hits).await;
        info!(sources = sources.len(), "Sources opened");

        let notes = if self.config.verify {
            self.verify(&sources).await
        } else {
            Vec::new()
        };

        let answer = self.synthesize(topic, &sources, &notes).await?;

        Ok(ResearchReport {
            topic: topic.to_string(),
            queries,
            sources,
            notes,
            answer,
        })
    }

    /// 1단계: 모델 호출 한 번으로 검색 쿼리 생성
    ///
    /// 출력은 줄 단위로 방어적으로 파싱합니다. 빈 출력이나 전송
    /// 실패면 주제 자체를 쿼리로 사용합니다.
    async fn plan(&self, topic: &str) -> Vec<String> {
        let prompt = format!(
            "List up to {} short web search queries that would help research the \
             following topic. One query per line, no numbering, no commentary.\n\nTopic: {}",
            self.config.max_queries, topic
        );

        let response = self
            .client
            .chat(ChatRequest::new(&self.model, vec![Message::user(prompt)]))
            .await;

        let queries = match response {
            Ok(r) => parse_queries(&r.content, self.config.max_queries),
            Err(e) => {
                warn!("Planning call failed, using topic as query: {}", e);
                Vec::new()
            }
        };

        if queries.is_empty() {
            vec![topic.to_string()]
        } else {
            queries
        }
    }

    /// 2단계: 쿼리별 검색, URL 기준 중복 제거, 상위 max_sources 유지
    async fn search_all(&self, queries: &[String]) -> Vec<SearchHit> {
        let mut all = Vec::new();
        for query in queries {
            match self.search.search(query, self.config.max_sources).await {
                Ok(hits) => all.extend(hits),
                Err(e) => warn!("Search failed for '{}': {}", query, e),
            }
        }
        dedupe_by_url(all, self.config.max_sources)
    }

    /// 3단계: 소스 열람 (실패한 소스는 건너뜀)
    async fn open_sources(&self, hits: Vec<SearchHit>) -> Vec<SourceDigest> {
        let mut sources = Vec::new();
        for hit in hits {
            match self
                .fetcher
                .fetch_text(&hit.url, self.config.per_source_chars)
                .await
            {
                Ok((title, text)) => sources.push(SourceDigest {
                    title: title.unwrap_or_else(|| hit.title.clone()),
                    url: hit.url,
                    snippet: hit.snippet,
                    text,
                }),
                Err(e) => {
                    debug!("Skipping source {}: {}", hit.url, e);
                }
            }
        }
        sources
    }

    /// 4단계 (선택): 소스별 주장/모순 메모
    async fn verify(&self, sources: &[SourceDigest]) -> Vec<String> {
        let mut notes = Vec::new();
        for source in sources {
            let prompt = format!(
                "Read the following source text and note, in 2-3 sentences, its key \
                 claims and anything that looks contradictory or unsupported.\n\n\
                 Source: {}\n\n{}",
                source.url, source.text
            );
            match self
                .client
                .chat(ChatRequest::new(&self.model, vec![Message::user(prompt)]))
                .await
            {
                Ok(r) if !r.content.trim().is_empty() => {
                    notes.push(format!("{}: {}", source.url, r.content.trim()));
                }
                Ok(_) => {}
                Err(e) => warn!("Verification skipped for {}: {}", source.url, e),
            }
        }
        notes
    }

    /// 5단계: 종합 (실패 시 다이제스트 절반으로 한 번 재시도)
    async fn synthesize(
        &self,
        topic: &str,
        sources: &[SourceDigest],
        notes: &[String],
    ) -> Result<String> {
        match self.synthesize_once(topic, sources, notes, 1).await {
            Some(answer) => return Ok(answer),
            None => warn!("Synthesis failed, retrying with halved digests"),
        }

        if let Some(answer) = self.synthesize_once(topic, sources, notes, 2).await {
            return Ok(answer);
        }

        // 마지막 보루: 소스 목록만이라도
        warn!("Synthesis retry failed, returning sources-only digest");
        Ok(sources_only_answer(topic, sources))
    }

    async fn synthesize_once(
        &self,
        topic: &str,
        sources: &[SourceDigest],
        notes: &[String],
        shrink: usize,
    ) -> Option<String> {
        let mut prompt = format!(
            "Write a concise, well-organized research summary on the topic below, \
             citing sources by URL.\n\nTopic: {}\n",
            topic
        );
        for source in sources {
            let cap = source.text.chars().count() / shrink;
            let text: String = source.text.chars().take(cap).collect();
            prompt.push_str(&format!("\n--- {} ({})\n{}\n", source.title, source.url, text));
        }
        if !notes.is_empty() {
            prompt.push_str("\nVerification notes:\n");
            for note in notes {
                prompt.push_str(&format!("- {}\n", note));
            }
        }

        match self
            .client
            .chat(ChatRequest::new(&self.model, vec![Message::user(prompt)]))
            .await
        {
            Ok(r) if !r.content.trim().is_empty() => Some(r.content),
            Ok(_) => None,
            Err(e) => {
                warn!("Synthesis call failed: {}", e);
                None
            }
        }
    }
}

/// 모델 출력에서 쿼리 추출
///
/// 번호/불릿 접두사를 벗기고 빈 줄을 건너뜁니다.
pub fn parse_queries(output: &str, max_queries: usize) -> Vec<String> {
    output
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(|c: char| c.is_ascii_digit() || c == '.' || c == ')' )
                .trim_start_matches(['-', '*', '•'])
                .trim()
                .trim_matches('"')
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .take(max_queries)
        .collect()
}

/// URL 기준 중복 제거 (첫 등장 순서 유지)
pub fn dedupe_by_url(hits: Vec<SearchHit>, limit: usize) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| !hit.url.is_empty() && seen.insert(hit.url.clone()))
        .take(limit)
        .collect()
}

fn sources_only_answer(topic: &str, sources: &[SourceDigest]) -> String {
    let mut out = format!(
        "A synthesized summary could not be produced. Sources gathered for '{}':\n",
        topic
    );
    if sources.is_empty() {
        out.push_str("(no sources could be retrieved)\n");
    }
    for source in sources {
        out.push_str(&format!("- {} - {}\n", source.title, source.url));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use driftwood_provider::{ChatResponse, ProviderError};
    use driftwood_tool::ProviderGate;
    use std::result::Result;

    #[test]
    fn test_parse_queries_strips_decorations() {
        let output = "1. rust borrow checker\n- async lifetimes\n\n* \"pin and unpin\"\n";
        let queries = parse_queries(output, 4);
        assert_eq!(
            queries,
            vec!["rust borrow checker", "async lifetimes", "pin and unpin"]
        );
    }

    #[test]
    fn test_parse_queries_respects_budget() {
        let output = "a\nb\nc\nd\ne";
        assert_eq!(parse_queries(output, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_queries_empty_output() {
        assert!(parse_queries("  \n\n", 4).is_empty());
    }

    #[test]
    fn test_dedupe_by_url() {
        let hit = |url: &str| SearchHit {
            title: url.to_string(),
            url: url.to_string(),
            snippet: String::new(),
        };
        let hits = vec![hit("a"), hit("b"), hit("a"), hit("c")];
        let deduped = dedupe_by_url(hits, 2);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].url, "a");
        assert_eq!(deduped[1].url, "b");
    }

    /// 항상 실패하는 모델 클라이언트
    struct DownClient;

    #[async_trait]
    impl ChatClient for DownClient {
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, ProviderError> {
            Err(ProviderError::Network("down".into()))
        }
    }

    #[tokio::test]
    async fn test_plan_falls_back_to_topic() {
        let pipeline = ResearchPipeline::new(
            Arc::new(DownClient),
            "m",
            Arc::new(WebSearchTool::new(None, ProviderGate::default())),
            ResearchConfig::default(),
        );
        let queries = pipeline.plan("rust async").await;
        assert_eq!(queries, vec!["rust async"]);
    }

    #[tokio::test]
    async fn test_synthesize_never_returns_nothing() {
        let pipeline = ResearchPipeline::new(
            Arc::new(DownClient),
            "m",
            Arc::new(WebSearchTool::new(None, ProviderGate::default())),
            ResearchConfig::default(),
        );
        let sources = vec![SourceDigest {
            title: "Rust Book".into(),
            url: "https://doc.rust-lang.org/book".into(),
            snippet: String::new(),
            text: "ownership".into(),
        }];

        let answer = pipeline.synthesize("rust", &sources, &[]).await.unwrap();
        assert!(answer.contains("https://doc.rust-lang.org/book"));
        assert!(answer.contains("could not be produced"));
    }
}
