//! Branch names, the retrieval discriminator, and the default record each
//! branch receives the first time the wizard reaches the step owning it.

use std::{fmt, str::FromStr};

use {
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
};

use crate::tree::{ConfigTree, Patch};

pub const GENERAL: &str = "general";
pub const INGESTION_SOURCE: &str = "ingestion.source";
pub const INGESTION_PARSING: &str = "ingestion.parsing";
pub const INGESTION_PREPROCESSING: &str = "ingestion.preprocessing";
pub const CHUNKING: &str = "chunking";
pub const EMBEDDING: &str = "embedding";
pub const VECTOR_STORE: &str = "vector_store";
pub const RETRIEVAL: &str = "retrieval";
pub const RETRIEVAL_SEMANTIC: &str = "retrieval.semantic";
pub const RETRIEVAL_LEXICAL: &str = "retrieval.lexical";
pub const RETRIEVAL_HYBRID: &str = "retrieval.hybrid";
pub const RERANK: &str = "rerank";
pub const LLM: &str = "llm";
pub const AGENTS: &str = "agents";

/// Dotted path of the field that decides which retrieval steps are shown.
pub const SEARCH_TYPE_PATH: &str = "retrieval.search_type";

/// Retrieval strategy chosen during setup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Semantic,
    Lexical,
    #[default]
    Hybrid,
}

impl SearchType {
    pub const ALL: [SearchType; 3] = [Self::Semantic, Self::Lexical, Self::Hybrid];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Lexical => "lexical",
            Self::Hybrid => "hybrid",
        }
    }

    /// Read the discriminator from `tree`.
    ///
    /// A missing or unrecognized value is treated as [`SearchType::Hybrid`],
    /// which keeps every retrieval step reachable.
    pub fn from_tree(tree: &ConfigTree) -> Self {
        match tree.value(SEARCH_TYPE_PATH) {
            Some(Value::String(raw)) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!(search_type = %raw, "unrecognized search type, using hybrid");
                Self::Hybrid
            }),
            Some(other) => {
                tracing::debug!(search_type = %other, "non-string search type, using hybrid");
                Self::Hybrid
            },
            None => Self::Hybrid,
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "lexical" => Ok(Self::Lexical),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown search type: {other}")),
        }
    }
}

/// The record a branch starts from when the wizard first reaches it.
///
/// Returns `None` for paths that are not wizard-owned branches.
pub fn default_record(path: &str) -> Option<Patch> {
    let value = match path {
        GENERAL => json!({
            "expertise_level": "simple",
            "ingestion_mode": "manual",
            "auto_ingestion_delay": 30,
            "watch_enabled": false,
        }),
        INGESTION_SOURCE => json!({
            "path": "",
            "recursive": true,
            "excluded_dirs": [],
            "file_types": ["pdf", "docx", "doc", "md", "txt"],
            "exclusion_patterns": [],
            "max_file_size_mb": 50,
        }),
        INGESTION_PARSING => json!({
            "engine": "auto",
            "ocr_enabled": false,
            "ocr_language": ["fra", "eng"],
            "ocr_engine": "tesseract",
            "table_extraction_strategy": "preserve",
            "image_captioning_enabled": false,
            "header_detection": true,
        }),
        INGESTION_PREPROCESSING => json!({
            "lowercase": false,
            "remove_punctuation": false,
            "normalize_unicode": true,
            "remove_urls": false,
            "language_detection": true,
            "deduplication_strategy": "exact",
            "deduplication_threshold": 0.95,
        }),
        CHUNKING => json!({
            "strategy": "recursive",
            "chunk_size": 512,
            "chunk_overlap": 100,
            "min_chunk_size": 50,
            "max_chunk_size": 2000,
            "preserve_sentences": true,
            "add_chunk_index": true,
            "add_document_title": true,
        }),
        EMBEDDING => json!({
            "provider": "huggingface",
            "model": "intfloat/multilingual-e5-large",
            "api_key_set": false,
            "batch_size": 100,
            "normalize": true,
            "cache_enabled": true,
            "timeout": 30,
        }),
        VECTOR_STORE => json!({
            "provider": "qdrant",
            "mode": "persistent",
            "collection_name": "ragkit_default",
            "distance_metric": "cosine",
            "hnsw": { "ef_construction": 128, "m": 16, "ef_search": 128 },
        }),
        RETRIEVAL => json!({ "search_type": "hybrid" }),
        RETRIEVAL_SEMANTIC => json!({
            "enabled": true,
            "top_k": 10,
            "threshold": 0.0,
            "weight": 1.0,
            "mmr_enabled": false,
            "mmr_lambda": 0.5,
        }),
        RETRIEVAL_LEXICAL => json!({
            "enabled": true,
            "algorithm": "bm25",
            "top_k": 15,
            "weight": 0.5,
            "bm25_k1": 1.5,
            "bm25_b": 0.75,
            "remove_stopwords": true,
            "stemming": true,
        }),
        RETRIEVAL_HYBRID => json!({
            "alpha": 0.5,
            "fusion_method": "rrf",
            "rrf_k": 60,
            "normalize_scores": true,
            "normalization_method": "min_max",
            "top_k": 10,
        }),
        RERANK => json!({
            "enabled": false,
            "provider": "none",
            "candidates": 40,
            "top_n": 5,
            "relevance_threshold": 0.0,
        }),
        LLM => json!({
            "provider": "openai",
            "model": "gpt-4o-mini",
            "api_key_set": false,
            "temperature": 0.1,
            "max_tokens": 2000,
            "cite_sources": true,
            "citation_format": "inline",
            "context_max_chunks": 5,
            "streaming": true,
        }),
        AGENTS => json!({
            "always_retrieve": false,
            "max_history_messages": 10,
            "memory_strategy": "sliding_window",
        }),
        _ => return None,
    };
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}
