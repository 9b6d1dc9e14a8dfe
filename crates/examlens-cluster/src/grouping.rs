//! Pairwise grouping: the "similar-to" relation and its connected components.

use tracing::debug;

use crate::error::ClusterError;
use crate::similarity::SimilarityBackend;
use crate::union_find::UnionFind;

/// Partition the backend's questions into connected components.
///
/// Every unordered pair `(i, j)` with `i < j` is scored once, in ascending
/// index order, and linked when the score reaches `threshold`. Questions
/// with `groupable[i] == false` are never scored and stay singletons.
/// Components are sorted by their smallest index, members ascending. An
/// empty backend yields an empty partition.
pub fn group_components(
    backend: &SimilarityBackend<'_>,
    threshold: f64,
    groupable: &[bool],
) -> Result<Vec<Vec<usize>>, ClusterError> {
    let n = backend.len();
    if groupable.len() != n {
        return Err(ClusterError::PreconditionViolation(format!(
            "groupable mask has {} entries for {} questions",
            groupable.len(),
            n
        )));
    }
    let mut uf = UnionFind::new(n);
    let mut edges = 0usize;

    for i in 0..n {
        if !groupable[i] {
            continue;
        }
        for j in (i + 1)..n {
            if groupable[j] && backend.similarity(i, j)? >= threshold {
                uf.union(i, j);
                edges += 1;
            }
        }
    }

    let components = uf.components();
    debug!(
        questions = n,
        edges,
        components = components.len(),
        threshold,
        backend = backend.kind().as_str(),
        "Grouping complete"
    );
    Ok(components)
}
