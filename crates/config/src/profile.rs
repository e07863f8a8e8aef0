//! Profile presets: a corpus profile plus six calibration answers seed the
//! branches the later wizard steps refine.

use std::{collections::BTreeMap, fmt, str::FromStr};

use {
    serde::{Deserialize, Serialize},
    serde_json::{Value, json},
};

use crate::{
    error::Error,
    schema,
    tree::{ConfigTree, Patch},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Profile {
    TechnicalDocumentation,
    FaqSupport,
    LegalCompliance,
    ReportsAnalysis,
    General,
}

impl Profile {
    pub const ALL: [Profile; 5] = [
        Self::TechnicalDocumentation,
        Self::FaqSupport,
        Self::LegalCompliance,
        Self::ReportsAnalysis,
        Self::General,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::TechnicalDocumentation => "technical_documentation",
            Self::FaqSupport => "faq_support",
            Self::LegalCompliance => "legal_compliance",
            Self::ReportsAnalysis => "reports_analysis",
            Self::General => "general",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::TechnicalDocumentation => "Technical documentation",
            Self::FaqSupport => "FAQ / Support",
            Self::LegalCompliance => "Legal / Compliance",
            Self::ReportsAnalysis => "Reports & analysis",
            Self::General => "General knowledge base",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Profile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.id() == s.trim())
            .ok_or_else(|| Error::UnknownProfile(s.to_string()))
    }
}

/// Answers to the calibration questionnaire, serialized as `q1`..`q6`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Documents contain tables or images.
    #[serde(rename = "q1")]
    pub tables_and_images: bool,
    /// Precise answers are preferred over summaries.
    #[serde(rename = "q2")]
    pub precise_answers: bool,
    #[serde(rename = "q3")]
    pub long_documents: bool,
    #[serde(rename = "q4")]
    pub multilingual: bool,
    #[serde(rename = "q5")]
    pub frequent_updates: bool,
    #[serde(rename = "q6")]
    pub strict_citations: bool,
}

impl Calibration {
    /// Build from question keys such as `["q1", "q3"]`. Unknown keys are
    /// ignored.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut calibration = Self::default();
        for key in keys {
            match key.trim() {
                "q1" => calibration.tables_and_images = true,
                "q2" => calibration.precise_answers = true,
                "q3" => calibration.long_documents = true,
                "q4" => calibration.multilingual = true,
                "q5" => calibration.frequent_updates = true,
                "q6" => calibration.strict_citations = true,
                _ => {},
            }
        }
        calibration
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileAnswers {
    pub profile: Profile,
    #[serde(default)]
    pub calibration: Calibration,
}

/// The branch patches derived from a set of answers, plus a short summary
/// for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSeed {
    pub profile: Profile,
    pub summary: BTreeMap<String, String>,
    pub patches: BTreeMap<&'static str, Patch>,
}

impl ProfileSeed {
    pub fn analyze(answers: &ProfileAnswers) -> Self {
        let mut seed = Self {
            profile: answers.profile,
            summary: BTreeMap::new(),
            patches: BTreeMap::new(),
        };

        match answers.profile {
            Profile::TechnicalDocumentation | Profile::ReportsAnalysis => {
                seed.set(schema::INGESTION_PARSING, "table_extraction_strategy", json!("markdown"));
                seed.set(schema::INGESTION_PREPROCESSING, "deduplication_threshold", json!(0.95));
            },
            Profile::FaqSupport => {
                seed.set(schema::INGESTION_PARSING, "table_extraction_strategy", json!("preserve"));
                seed.set(schema::INGESTION_PREPROCESSING, "remove_urls", json!(true));
                seed.set(schema::INGESTION_PREPROCESSING, "deduplication_strategy", json!("fuzzy"));
                seed.set(schema::INGESTION_PREPROCESSING, "deduplication_threshold", json!(0.85));
            },
            Profile::LegalCompliance => {
                seed.set(schema::INGESTION_PARSING, "ocr_language", json!(["fra"]));
                seed.set(schema::INGESTION_PREPROCESSING, "deduplication_strategy", json!("exact"));
                seed.set(schema::INGESTION_PREPROCESSING, "deduplication_threshold", json!(0.98));
            },
            Profile::General => {
                seed.set(schema::INGESTION_PREPROCESSING, "deduplication_threshold", json!(0.90));
            },
        }

        let c = answers.calibration;
        if c.tables_and_images {
            seed.set(schema::INGESTION_PARSING, "table_extraction_strategy", json!("markdown"));
            seed.set(schema::INGESTION_PARSING, "ocr_enabled", json!(true));
            seed.set(schema::INGESTION_PARSING, "image_captioning_enabled", json!(true));
        }
        seed.set(schema::RETRIEVAL_SEMANTIC, "enabled", json!(true));
        seed.set(schema::RETRIEVAL_SEMANTIC, "top_k", json!(if c.precise_answers { 20 } else { 10 }));
        if c.precise_answers {
            seed.set(schema::LLM, "context_max_chunks", json!(10));
        }
        if c.long_documents {
            seed.set(schema::CHUNKING, "chunk_size", json!(1536));
            seed.set(schema::CHUNKING, "chunk_overlap", json!(200));
        }
        if c.multilingual {
            seed.set(schema::RERANK, "enabled", json!(true));
            seed.set(schema::LLM, "temperature", json!(0.0));
        }
        if c.frequent_updates {
            seed.set(schema::GENERAL, "ingestion_mode", json!("auto"));
            seed.set(schema::GENERAL, "watch_enabled", json!(true));
        }
        if c.strict_citations {
            seed.set(schema::CHUNKING, "add_chunk_index", json!(true));
            seed.set(schema::LLM, "cite_sources", json!(true));
            seed.set(schema::LLM, "citation_format", json!("footnote"));
        }

        seed.set(schema::GENERAL, "profile", json!(answers.profile.id()));
        seed.set(
            schema::GENERAL,
            "calibration_answers",
            serde_json::to_value(c).unwrap_or(Value::Null),
        );

        let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
        let ocr = seed
            .patches
            .get(schema::INGESTION_PARSING)
            .and_then(|p| p.get("ocr_enabled"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        seed.summary
            .insert("Profile".into(), answers.profile.display_name().into());
        seed.summary.insert(
            "Mode".into(),
            if c.frequent_updates { "Auto" } else { "Manual" }.into(),
        );
        seed.summary
            .insert("Citations".into(), yes_no(c.strict_citations).into());
        seed.summary.insert("OCR".into(), yes_no(ocr).into());
        seed
    }

    /// Merge every patch into `tree`, one branch at a time.
    #[must_use]
    pub fn apply_to(&self, tree: &ConfigTree) -> ConfigTree {
        self.patches
            .iter()
            .fold(tree.clone(), |acc, (path, patch)| acc.apply(path, patch))
    }

    fn set(&mut self, path: &'static str, key: &str, value: Value) {
        self.patches
            .entry(path)
            .or_default()
            .insert(key.to_string(), value);
    }
}
