//! Longest-matching-block similarity ratio.
//!
//! The ratio is `2 * M / T`, where `T` is the combined length of both
//! sequences and `M` the total size of the blocks found by repeatedly taking
//! the longest common contiguous run and recursing on what lies to its left
//! and right. When several runs share the longest size, the one starting
//! earliest in `a` wins, then the one starting earliest in `b`.
//!
//! No "junk" heuristics are applied, so results depend only on the inputs.

/// A common run: `a[a..a + size] == b[b..b + size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchingBlock {
    pub a: usize,
    pub b: usize,
    pub size: usize,
}

/// Similarity of two strings in `[0, 1]`, compared by Unicode scalar value.
///
/// Two empty strings are identical (`1.0`).
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    sequence_ratio(&a, &b)
}

/// [`ratio`] over arbitrary sequences.
pub fn sequence_ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched: usize = matching_blocks(a, b).iter().map(|m| m.size).sum();
    2.0 * matched as f64 / total as f64
}

/// All matching blocks, ordered by position in `a`.
pub fn matching_blocks<T: PartialEq>(a: &[T], b: &[T]) -> Vec<MatchingBlock> {
    let mut blocks = Vec::new();
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let m = longest_match(a, b, alo, ahi, blo, bhi);
        if m.size == 0 {
            continue;
        }
        if alo < m.a && blo < m.b {
            pending.push((alo, m.a, blo, m.b));
        }
        if m.a + m.size < ahi && m.b + m.size < bhi {
            pending.push((m.a + m.size, ahi, m.b + m.size, bhi));
        }
        blocks.push(m);
    }

    blocks.sort_by_key(|m| (m.a, m.b));
    blocks
}

/// Longest common run inside `a[alo..ahi]` and `b[blo..bhi]`.
fn longest_match<T: PartialEq>(
    a: &[T],
    b: &[T],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> MatchingBlock {
    let mut best = MatchingBlock {
        a: alo,
        b: blo,
        size: 0,
    };
    if alo >= ahi || blo >= bhi {
        return best;
    }

    // prev[k + 1] is the length of the common suffix ending at a[i - 1], b[blo + k].
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = if a[i] == b[j] { prev[j - blo] + 1 } else { 0 };
            curr[j - blo + 1] = k;
            // Strict comparison keeps the earliest run on ties.
            if k > best.size {
                best = MatchingBlock {
                    a: i + 1 - k,
                    b: j + 1 - k,
                    size: k,
                };
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    best
}
