//! Permutation representation for QAP solutions.
//!
//! A permutation of length `n` holds every facility in `[0, n)` exactly once;
//! position `i` of the permutation is the `i`-th step of an ant's path.

use serde::{Deserialize, Serialize};

use crate::error::{AcoError, AcoResult};

/// An assignment of facilities to path positions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<usize>", into = "Vec<usize>")]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Validate `nodes` as a permutation of `[0, nodes.len())`.
    pub fn new(nodes: Vec<usize>) -> AcoResult<Self> {
        let n = nodes.len();
        if n == 0 {
            return Err(AcoError::shape("a permutation needs at least one node"));
        }

        let mut seen = vec![false; n];
        for &node in &nodes {
            if node >= n {
                return Err(AcoError::shape(format!(
                    "node {} out of range for a permutation of length {}",
                    node, n
                )));
            }
            if seen[node] {
                return Err(AcoError::shape(format!("node {} appears twice", node)));
            }
            seen[node] = true;
        }

        Ok(Permutation(nodes))
    }

    /// Wrap a path already known to be a permutation.
    pub(crate) fn from_complete_path(nodes: Vec<usize>) -> Self {
        debug_assert!(Self::new(nodes.clone()).is_ok());
        Permutation(nodes)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    /// First node of the path
    pub fn start(&self) -> usize {
        self.0[0]
    }

    /// Directed edges `(path[x], path[x + 1])` in path order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.windows(2).map(|w| (w[0], w[1]))
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = AcoError;

    fn try_from(nodes: Vec<usize>) -> AcoResult<Self> {
        Self::new(nodes)
    }
}

impl From<Permutation> for Vec<usize> {
    fn from(permutation: Permutation) -> Self {
        permutation.0
    }
}

impl AsRef<[usize]> for Permutation {
    fn as_ref(&self) -> &[usize] {
        &self.0
    }
}

impl std::fmt::Display for Permutation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let nodes: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "[{}]", nodes.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_permutation() {
        let perm = Permutation::new(vec![2, 0, 3, 1]).unwrap();
        assert_eq!(perm.len(), 4);
        assert_eq!(perm.start(), 2);
        assert_eq!(perm.to_string(), "[2 0 3 1]");
    }

    #[test]
    fn test_rejects_repeats_and_out_of_range() {
        assert!(Permutation::new(vec![0, 1, 1]).is_err());
        assert!(Permutation::new(vec![0, 3, 1]).is_err());
        assert!(Permutation::new(Vec::new()).is_err());
    }

    #[test]
    fn test_edges() {
        let perm = Permutation::new(vec![1, 2, 0]).unwrap();
        let edges: Vec<_> = perm.edges().collect();
        assert_eq!(edges, vec![(1, 2), (2, 0)]);

        let single = Permutation::new(vec![0]).unwrap();
        assert_eq!(single.edges().count(), 0);
    }

    #[test]
    fn test_serde_validates() {
        let perm: Permutation = serde_json::from_str("[1,0,2]").unwrap();
        assert_eq!(perm.as_slice(), &[1, 0, 2]);
        assert!(serde_json::from_str::<Permutation>("[1,1,2]").is_err());
        assert_eq!(serde_json::to_string(&perm).unwrap(), "[1,0,2]");
    }
}
