//! Character frequency ranking.
//!
//! Counts the characters of a text, ranks them by how often they occur, and
//! seeds a [`HashTree`] with the ranked symbols. This is the first step of
//! a Huffman-style experiment; no code table is built here.

use std::collections::HashMap;

use crate::tree::HashTree;

/// Occurrences of each character in `text`.
#[must_use]
pub fn char_counts(text: &str) -> HashMap<char, usize> {
    let mut counts: HashMap<char, usize> = HashMap::new();
    for c in text.chars() {
        *counts.entry(c).or_insert(0) += 1;
    }
    counts
}

/// Characters ordered by descending count.
///
/// Equal counts are ordered by character so the ranking is deterministic.
#[must_use]
pub fn rank_by_count(counts: &HashMap<char, usize>) -> Vec<(char, usize)> {
    let mut ranked: Vec<(char, usize)> = counts.iter().map(|(c, n)| (*c, *n)).collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked
}

/// A tree seeded with the least frequent character of `text`, holding every
/// distinct character as a one-character text value.
///
/// Returns `None` for empty text.
#[must_use]
pub fn seed_tree(text: &str) -> Option<HashTree> {
    let ranked: Vec<(char, usize)> = rank_by_count(&char_counts(text));
    let (least, _) = *ranked.last()?;

    let tree = HashTree::with_seed(least);
    for (symbol, _) in &ranked {
        tree.insert(*symbol);
    }
    Some(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Value;

    #[test]
    fn test_char_counts() {
        let counts = char_counts("abracadabra");

        assert_eq!(counts[&'a'], 5);
        assert_eq!(counts[&'b'], 2);
        assert_eq!(counts[&'r'], 2);
        assert_eq!(counts[&'c'], 1);
        assert_eq!(counts[&'d'], 1);
        assert_eq!(counts.len(), 5);
    }

    #[test]
    fn test_rank_by_count_descending_with_ties_by_char() {
        let ranked = rank_by_count(&char_counts("abracadabra"));

        assert_eq!(
            ranked,
            vec![('a', 5), ('b', 2), ('r', 2), ('c', 1), ('d', 1)]
        );
    }

    #[test]
    fn test_seed_tree_holds_every_symbol() {
        let tree = seed_tree("abracadabra").unwrap();

        assert_eq!(tree.root().unwrap().value(), &Value::from('d'));
        assert_eq!(tree.len(), 5);
        for c in ['a', 'b', 'r', 'c', 'd'] {
            assert!(tree.contains(&Value::from(c)));
        }
        assert_eq!(tree.check_invariants(), Ok(5));
    }

    #[test]
    fn test_seed_tree_empty_text() {
        assert!(seed_tree("").is_none());
    }
}
