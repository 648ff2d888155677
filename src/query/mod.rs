//! Query & Answer Composer.
//!
//! Turns a scoped free-text query into ranked search results and an
//! extractive, citation-backed answer, applying SLO backoff to the rerank
//! width when the caller's observed session latency is elevated.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::ids::Id;
use crate::index::{Corpus, ScoredPassage};
use crate::observability::MetricsRegistry;
use crate::store::StoragePort;

/// Fraction of query tokens a composed answer's citations must cover before
/// it is returned instead of a `no_answer_reason`.
pub const ANSWER_COVERAGE_THRESHOLD: f64 = 0.6;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub collections: Option<Vec<Id>>,
    pub page: usize,
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub note_id: Id,
    pub version_id: Id,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub collection_ids: Vec<Id>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Citation {
    pub note_id: Id,
    pub version_id: Id,
    pub passage_id: Id,
    pub anchor: crate::anchor::Anchor,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoAnswerReason {
    InsufficientEvidence,
    UnresolvedCitations,
    NotIndexed,
    NoPublishedVersions,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub answer: Option<String>,
    pub results: Vec<SearchResult>,
    pub citations: Vec<Citation>,
    pub query_id: Id,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub has_more: bool,
    pub no_answer_reason: Option<NoAnswerReason>,
    pub deterministic: bool,
}

/// Runs one search: retrieves candidates, reranks them, paginates search
/// results, and composes an extractive answer from the top non-overlapping
/// passages. The rerank width backs off once this registry's own rolling
/// `search.latency_ms` P95 crosses `config.search_p95_backoff_ms`.
pub async fn search(
    store: &Arc<dyn StoragePort>,
    corpus: &Corpus,
    metrics: &MetricsRegistry,
    config: &Config,
    req: SearchRequest,
) -> Result<SearchResponse> {
    let started = std::time::Instant::now();
    let page_size = req.page_size.unwrap_or(config.page_size).max(1);
    let observed_p95 = metrics.percentiles("search.latency_ms");
    let observed_p95_ms = if observed_p95.p95 > 0 { Some(observed_p95.p95) } else { None };
    let top_k_rerank = config.effective_top_k_rerank(observed_p95_ms);

    let candidates = corpus.retrieve_candidates(&req.query, req.collections.as_deref(), config.top_k_retrieve);
    let mut reranked = candidates;
    reranked.truncate(top_k_rerank);

    let mut results = Vec::with_capacity(reranked.len());
    for scored in &reranked {
        let note = store.get_note(&scored.passage.note_id).await?;
        let collection_ids = store.collections_for_note(&scored.passage.note_id).await?;
        results.push(SearchResult {
            note_id: scored.passage.note_id.clone(),
            version_id: scored.passage.version_id.clone(),
            title: note.title,
            snippet: truncate_snippet(&scored.passage.text),
            score: scored.score,
            collection_ids,
        });
    }

    let total_count = results.len();
    let offset = req.page.saturating_mul(page_size);
    let has_more = offset + page_size < total_count;
    let page_results: Vec<SearchResult> = results.into_iter().skip(offset).take(page_size).collect();

    let (answer, citations, no_answer_reason) =
        compose_answer(store.as_ref(), &req.query, &reranked, metrics).await?;

    let health = store.get_storage_health().await?;
    let no_answer_reason = no_answer_reason.or_else(|| {
        if answer.is_some() {
            None
        } else if health.publications == 0 {
            Some(NoAnswerReason::NoPublishedVersions)
        } else if reranked.is_empty() {
            Some(NoAnswerReason::NotIndexed)
        } else {
            Some(NoAnswerReason::InsufficientEvidence)
        }
    });

    metrics.record_latency_ms("search.latency_ms", started.elapsed().as_millis() as u64);

    Ok(SearchResponse {
        answer,
        results: page_results,
        citations,
        query_id: Id::new(crate::ids::IdKind::Session),
        page: req.page,
        page_size,
        total_count,
        has_more,
        no_answer_reason,
        deterministic: true,
    })
}

async fn compose_answer(
    store: &dyn StoragePort,
    query: &str,
    reranked: &[ScoredPassage],
    metrics: &MetricsRegistry,
) -> Result<(Option<String>, Vec<Citation>, Option<NoAnswerReason>)> {
    let query_tokens = query_token_set(query);
    if query_tokens.is_empty() || reranked.is_empty() {
        return Ok((None, Vec::new(), None));
    }

    let mut covered: HashSet<String> = HashSet::new();
    let mut citations = Vec::new();
    let mut snippets = Vec::new();
    let mut attempted = 0u32;
    let mut resolved = 0u32;

    for scored in reranked {
        let coverage = covered.len() as f64 / query_tokens.len() as f64;
        if coverage >= ANSWER_COVERAGE_THRESHOLD {
            break;
        }

        attempted += 1;
        let snippet = match store
            .resolve_anchor_text(&scored.passage.version_id, &scored.passage.anchor)
            .await?
        {
            Some(text) => text,
            None => continue,
        };
        resolved += 1;

        let passage_tokens = query_token_set(&snippet);
        let newly_covered: Vec<String> = passage_tokens.intersection(&query_tokens).cloned().collect();
        if newly_covered.is_empty() {
            continue;
        }
        covered.extend(newly_covered);

        citations.push(Citation {
            note_id: scored.passage.note_id.clone(),
            version_id: scored.passage.version_id.clone(),
            passage_id: scored.passage.id.clone(),
            anchor: scored.passage.anchor.clone(),
            snippet: truncate_snippet(&snippet),
        });
        snippets.push(truncate_snippet(&snippet));
    }

    if attempted > 0 {
        metrics.record_latency_ms("answer.citation_coverage", ((resolved as f64 / attempted as f64) * 100.0) as u64);
    }
    metrics.record_latency_ms("anchor.resolution_rate", if attempted == 0 { 100 } else { (resolved * 100 / attempted) as u64 });

    let coverage = covered.len() as f64 / query_tokens.len() as f64;
    if citations.is_empty() {
        return Ok((None, Vec::new(), Some(NoAnswerReason::UnresolvedCitations)));
    }
    if coverage < ANSWER_COVERAGE_THRESHOLD {
        return Ok((None, Vec::new(), Some(NoAnswerReason::InsufficientEvidence)));
    }

    Ok((Some(snippets.join(" ")), citations, None))
}

fn query_token_set(text: &str) -> HashSet<String> {
    crate::anchor::tokenizer::tokenize(&crate::anchor::tokenizer::normalize(text))
        .into_iter()
        .map(|t| t.text.to_lowercase())
        .collect()
}

fn truncate_snippet(text: &str) -> String {
    const MAX_SNIPPET_CHARS: usize = 320;
    if text.chars().count() <= MAX_SNIPPET_CHARS {
        text.to_string()
    } else {
        text.chars().take(MAX_SNIPPET_CHARS).collect::<String>() + "…"
    }
}
