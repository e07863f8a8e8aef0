//! Pure step table for the setup wizard. No I/O.
//!
//! Step adjacency depends on the retrieval strategy held in the config, so
//! both directions take the current [`SearchType`] on every call instead of
//! consulting a precomputed graph.

use {
    ragkit_config::{SearchType, schema},
    serde::Serialize,
};

/// Steps in the setup wizard, in trunk order. The discriminant is the
/// persisted step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Welcome,
    SystemCheck,
    Expertise,
    Profile,
    Source,
    Parsing,
    Chunking,
    Embedding,
    VectorStore,
    SearchType,
    Semantic,
    Lexical,
    HybridFusion,
    HybridWeighting,
    Reranking,
    Generation,
}

impl WizardStep {
    pub const ALL: [WizardStep; 16] = [
        Self::Welcome,
        Self::SystemCheck,
        Self::Expertise,
        Self::Profile,
        Self::Source,
        Self::Parsing,
        Self::Chunking,
        Self::Embedding,
        Self::VectorStore,
        Self::SearchType,
        Self::Semantic,
        Self::Lexical,
        Self::HybridFusion,
        Self::HybridWeighting,
        Self::Reranking,
        Self::Generation,
    ];

    /// Index of the final step.
    pub const LAST: usize = Self::ALL.len() - 1;

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// One-based position shown to the user, e.g. `10/16`.
    pub fn position(self) -> String {
        format!("{}/{}", self.index() + 1, Self::ALL.len())
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Welcome => "Welcome to ragkit! Let's set up your knowledge base.",
            Self::SystemCheck => "Checking your environment (GPU, local models, key store).",
            Self::Expertise => "How much detail do you want in the settings?",
            Self::Profile => "What kind of documents will you index?",
            Self::Source => "Where are your documents?",
            Self::Parsing => "How should documents be parsed and cleaned?",
            Self::Chunking => "How should documents be split into chunks?",
            Self::Embedding => "Which embedding model should encode chunks?",
            Self::VectorStore => "Where should vectors be stored?",
            Self::SearchType => "Which search strategy should answer questions?",
            Self::Semantic => "Semantic search parameters.",
            Self::Lexical => "Lexical (BM25) search parameters.",
            Self::HybridFusion => "How should semantic and lexical results be fused?",
            Self::HybridWeighting => "How much weight should each search side get?",
            Self::Reranking => "Should results be reranked?",
            Self::Generation => "Which language model and agent behaviour should answer?",
        }
    }

    /// Branches that must exist once the wizard stands on this step.
    pub fn owned_branches(self) -> &'static [&'static str] {
        match self {
            Self::Welcome | Self::SystemCheck => &[],
            Self::Expertise | Self::Profile => &[schema::GENERAL],
            Self::Source => &[schema::INGESTION_SOURCE],
            Self::Parsing => &[schema::INGESTION_PARSING, schema::INGESTION_PREPROCESSING],
            Self::Chunking => &[schema::CHUNKING],
            Self::Embedding => &[schema::EMBEDDING],
            Self::VectorStore => &[schema::VECTOR_STORE],
            Self::SearchType => &[schema::RETRIEVAL],
            Self::Semantic => &[schema::RETRIEVAL_SEMANTIC],
            Self::Lexical => &[schema::RETRIEVAL_LEXICAL],
            Self::HybridFusion | Self::HybridWeighting => &[schema::RETRIEVAL_HYBRID],
            Self::Reranking => &[schema::RERANK],
            Self::Generation => &[schema::LLM, schema::AGENTS],
        }
    }

    /// Whether the step is on the path for `search_type`. Trunk steps are
    /// always reachable; retrieval steps only for the strategies using them.
    pub fn is_reachable(self, search_type: SearchType) -> bool {
        use SearchType::*;
        match self {
            Self::Semantic => matches!(search_type, Semantic | Hybrid),
            Self::Lexical => matches!(search_type, Lexical | Hybrid),
            Self::HybridFusion | Self::HybridWeighting => search_type == Hybrid,
            _ => true,
        }
    }
}

/// The step after `current` for `search_type`.
///
/// Out-of-range indices are clamped to the last step; the last step maps to
/// itself.
pub fn next_step(current: usize, search_type: SearchType) -> usize {
    let current = current.min(WizardStep::LAST);
    WizardStep::ALL[current + 1..]
        .iter()
        .find(|step| step.is_reachable(search_type))
        .map_or(current, |step| step.index())
}

/// The step before `current` for `search_type`. Step 0 maps to itself.
pub fn prev_step(current: usize, search_type: SearchType) -> usize {
    let current = current.min(WizardStep::LAST);
    WizardStep::ALL[..current]
        .iter()
        .rev()
        .find(|step| step.is_reachable(search_type))
        .map_or(current, |step| step.index())
}
