//! Fuzzy title matching.
//!
//! Scores use the Ratcliff/Obershelp "gestalt" ratio `2 * M / T`, where `M`
//! counts the characters of the recursively found longest common blocks and
//! `T` is the combined length of both strings. Matching is case-sensitive.

use std::collections::HashMap;

/// Similarity ratio in `[0, 1]`; two empty strings score 1.
pub fn ratio(candidate: &str, query: &str) -> f64 {
    let a: Vec<char> = candidate.chars().collect();
    let b: Vec<char> = query.chars().collect();
    scaled(matching_chars(&a, &b), a.len() + b.len())
}

/// Highest-scoring candidate with a ratio of at least `cutoff`.
///
/// Ties go to the lexicographically greatest title. The two cheap upper bounds on the
/// ratio are checked first so most titles never reach the full comparison.
pub fn best_match<'a, I>(query: &str, candidates: I, cutoff: f64) -> Option<(&'a str, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let b: Vec<char> = query.chars().collect();
    let mut b_counts: HashMap<char, usize> = HashMap::new();
    for &c in &b {
        *b_counts.entry(c).or_insert(0) += 1;
    }

    let mut best: Option<(&'a str, f64)> = None;
    for candidate in candidates {
        let a: Vec<char> = candidate.chars().collect();
        let total = a.len() + b.len();
        // Length bound, then shared-character bound
        if scaled(a.len().min(b.len()), total) < cutoff {
            continue;
        }
        if scaled(shared_chars(&a, &b_counts), total) < cutoff {
            continue;
        }
        let score = scaled(matching_chars(&a, &b), total);
        let better = best.is_none_or(|(title, top)| {
            score > top || (score == top && candidate > title)
        });
        if score >= cutoff && better {
            best = Some((candidate, score));
        }
    }
    best
}

fn scaled(matches: usize, total: usize) -> f64 {
    if total == 0 {
        1.0
    } else {
        2.0 * matches as f64 / total as f64
    }
}

/// Size of the character multiset intersection
fn shared_chars(a: &[char], b_counts: &HashMap<char, usize>) -> usize {
    let mut available = b_counts.clone();
    let mut shared = 0;
    for c in a {
        if let Some(n) = available.get_mut(c) {
            if *n > 0 {
                *n -= 1;
                shared += 1;
            }
        }
    }
    shared
}

/// Characters covered by the matching blocks of `a` and `b`
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_block(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }
    total
}

/// Longest common block `(start in a, start in b, length)` within the given
/// ranges; the earliest one wins among equals.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let width = bhi - blo;
    let mut best = (alo, blo, 0);
    // run[j + 1]: length of the common run ending at (i, blo + j)
    let mut prev = vec![0usize; width + 1];
    let mut run = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in 0..width {
            run[j + 1] = if a[i] == b[blo + j] { prev[j] + 1 } else { 0 };
            let k = run[j + 1];
            if k > best.2 {
                best = (i + 1 - k, blo + j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut run);
    }
    best
}
