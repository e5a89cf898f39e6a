//! Greedy byte-pair merging over a single chunk.
//!
//! Symbols are kept as byte ranges into the remapped chunk: a merged symbol is
//! always a contiguous run of the original characters, so merging two symbols is
//! just joining their ranges. Each round picks the adjacent pair with the lowest
//! rank and merges every non-overlapping occurrence of it, left to right. The
//! loop ends when one symbol remains or no adjacent pair has a rank.

use std::ops::Range;

use super::byte_level::byte_level_encode;
use super::vocab::MergeRanks;

/// Remap `chunk` to byte-level characters and merge it.
///
/// Returns the merged symbols joined by single spaces. Byte-level symbols never
/// contain a space, so the result splits back unambiguously.
pub fn byte_pair_merge(chunk: &str, ranks: &MergeRanks) -> String {
    let word = byte_level_encode(chunk.as_bytes());
    merge_symbols(&word, ranks)
}

/// Merge an already remapped word.
pub fn merge_symbols(word: &str, ranks: &MergeRanks) -> String {
    let mut parts: Vec<Range<usize>> = word
        .char_indices()
        .map(|(i, ch)| i..i + ch.len_utf8())
        .collect();
    if parts.len() < 2 {
        return word.to_string();
    }

    let mut merged = Vec::with_capacity(parts.len());
    while let Some((left, right)) = lowest_ranked_pair(word, &parts, ranks) {
        merged.clear();
        let mut i = 0;
        while i < parts.len() {
            if i + 1 < parts.len()
                && &word[parts[i].clone()] == left
                && &word[parts[i + 1].clone()] == right
            {
                merged.push(parts[i].start..parts[i + 1].end);
                i += 2;
            } else {
                merged.push(parts[i].clone());
                i += 1;
            }
        }
        std::mem::swap(&mut parts, &mut merged);

        if parts.len() == 1 {
            break;
        }
    }

    let mut out = String::with_capacity(word.len() + parts.len());
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&word[part]);
    }
    out
}

/// Adjacent pair with the lowest rank. Ties go to the leftmost pair.
fn lowest_ranked_pair<'w>(
    word: &'w str,
    parts: &[Range<usize>],
    ranks: &MergeRanks,
) -> Option<(&'w str, &'w str)> {
    let mut best: Option<(u32, &'w str, &'w str)> = None;
    for window in parts.windows(2) {
        let left = &word[window[0].clone()];
        let right = &word[window[1].clone()];
        if let Some(rank) = ranks.rank(left, right) {
            if best.map_or(true, |(best_rank, _, _)| rank < best_rank) {
                best = Some((rank, left, right));
            }
        }
    }
    best.map(|(_, left, right)| (left, right))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_symbol_is_its_own_result() {
        let ranks = MergeRanks::from_pairs([("a", "b")]);
        assert_eq!(byte_pair_merge("a", &ranks), "a");
        assert_eq!(byte_pair_merge(" ", &ranks), "Ġ");
        assert_eq!(byte_pair_merge("", &ranks), "");
    }

    #[test]
    fn test_simple_merge() {
        let ranks = MergeRanks::from_pairs([("a", "b")]);
        assert_eq!(byte_pair_merge("ab", &ranks), "ab");
        assert_eq!(byte_pair_merge("abc", &ranks), "ab c");
    }

    #[test]
    fn test_no_ranked_pair_leaves_characters() {
        let ranks = MergeRanks::from_pairs([("x", "y")]);
        assert_eq!(byte_pair_merge("abc", &ranks), "a b c");
    }

    #[test]
    fn test_lower_rank_wins() {
        // "bc" outranks "ab", so "abc" becomes "a bc" even though "ab" is leftmost.
        let ranks = MergeRanks::from_pairs([("b", "c"), ("a", "b")]);
        assert_eq!(byte_pair_merge("abc", &ranks), "a bc");

        let ranks = MergeRanks::from_pairs([("a", "b"), ("b", "c")]);
        assert_eq!(byte_pair_merge("abc", &ranks), "ab c");
    }

    #[test]
    fn test_merges_every_occurrence_left_to_right() {
        let ranks = MergeRanks::from_pairs([("a", "a")]);
        // Non-overlapping scan: "aaa" -> "aa a", never "a aa".
        assert_eq!(byte_pair_merge("aaa", &ranks), "aa a");
        assert_eq!(byte_pair_merge("aaaa", &ranks), "aa aa");

        let ranks = MergeRanks::from_pairs([("a", "a"), ("aa", "aa")]);
        assert_eq!(byte_pair_merge("aaaa", &ranks), "aaaa");
        assert_eq!(byte_pair_merge("aaaaa", &ranks), "aaaa a");
    }

    #[test]
    fn test_merge_chain_builds_word() {
        let ranks = MergeRanks::from_pairs([
            ("Ġ", "t"),
            ("h", "e"),
            ("Ġt", "he"),
            ("Ġthe", "re"),
            ("r", "e"),
        ]);
        assert_eq!(byte_pair_merge(" the", &ranks), "Ġthe");
        // "re" (rank 4) is merged before "Ġthe"+"re" (rank 3) can apply.
        assert_eq!(byte_pair_merge(" there", &ranks), "Ġthere");
        assert_eq!(byte_pair_merge(" then", &ranks), "Ġthe n");
    }

    #[test]
    fn test_pair_must_match_exact_symbols() {
        // ("ab", "c") must not fire on the symbols "a" "bc".
        let ranks = MergeRanks::from_pairs([("b", "c"), ("ab", "c")]);
        assert_eq!(byte_pair_merge("abc", &ranks), "a bc");
    }

    #[test]
    fn test_multibyte_input_is_remapped_first() {
        // "é" is C3 A9, remapped to "Ã©".
        let ranks = MergeRanks::from_pairs([("Ã", "©")]);
        assert_eq!(byte_pair_merge("é", &ranks), "Ã©");
        assert_eq!(byte_pair_merge("éé", &ranks), "Ã© Ã©");
    }

    #[test]
    fn test_stops_at_single_symbol() {
        let ranks = MergeRanks::from_pairs([("a", "b"), ("ab", "ab")]);
        assert_eq!(byte_pair_merge("abab", &ranks), "abab");
    }
}
