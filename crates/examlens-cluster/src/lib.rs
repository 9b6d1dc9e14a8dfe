//! ExamLens clustering crate - groups recurring exam questions into topic
//! clusters and ranks them by priority tier.
//!
//! Pipeline per (subject, module) scope:
//! - Text normalization and keyword extraction
//! - Similarity backend selection (embedding cosine or keyword Jaccard)
//! - Pairwise grouping into connected components via union-find
//! - Cluster building with representative text, aggregates and tiering

pub mod builder;
pub mod error;
pub mod grouping;
pub mod keywords;
pub mod normalize;
pub mod orchestrator;
pub mod similarity;
pub mod state;
pub mod tier;
pub mod topic;
pub mod union_find;

pub use builder::ClusterBuilder;
pub use error::ClusterError;
pub use grouping::group_components;
pub use keywords::extract_keywords;
pub use normalize::normalize_text;
pub use orchestrator::{
    cluster_scope, cluster_scope_staged, partition_by_module, ClusteringService, ScopeFailure,
    ScopeOutcome, SubjectReport,
};
pub use similarity::{cosine_similarity, jaccard_similarity, SimilarityBackend};
pub use state::ScopeState;
pub use tier::priority_tier;
