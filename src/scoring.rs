//! Title similarity scoring.
//!
//! Ratcliff/Obershelp "gestalt" ratio: find the longest common contiguous
//! block, recurse on the pieces to its left and right, and report
//! `2 * matched / (len(a) + len(b))`. Operates on chars, no junk heuristic.

/// A candidate title must score strictly above this to link to a known
/// title of the same artist. Fixed; changing it changes which rows merge.
pub const SIMILARITY_THRESHOLD: f64 = 0.625;

/// Normalized similarity in `[0.0, 1.0]`; 1.0 only for identical strings.
///
/// Symmetric: the pair is put in a canonical order before matching, since
/// the block search breaks ties by position in its first argument.
pub fn similarity(a: &str, b: &str) -> f64 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let first: Vec<char> = first.chars().collect();
    let second: Vec<char> = second.chars().collect();

    let total = first.len() + second.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_chars(&first, &second);
    2.0 * matched as f64 / total as f64
}

/// True when `candidate` is close enough to `known` to be the same song.
pub fn is_similar_title(candidate: &str, known: &str) -> bool {
    similarity(candidate, known) > SIMILARITY_THRESHOLD
}

/// Total size of all matching blocks between `a` and `b`.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    // Explicit work stack instead of recursion; block order does not
    // affect the sum.
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]` as
/// `(start_in_a, start_in_b, size)`.
///
/// Among equally long blocks the one ending earliest in `a` wins, then the
/// one ending earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    if alo >= ahi || blo >= bhi {
        return (best_i, best_j, best_size);
    }

    let width = bhi - blo;
    // run[k + 1] = length of the common suffix ending at a[i - 1], b[blo + k]
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for k in 0..width {
            let j = blo + k;
            if a[i] == b[j] {
                let run = prev[k] + 1;
                curr[k + 1] = run;
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            } else {
                curr[k + 1] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}

// ============================================================================
// TESTS
// ============================================================================
