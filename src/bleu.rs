use std::collections::HashMap;

const MAX_ORDER: usize = 4;

fn ngram_counts<'t, 'a>(tokens: &'t [&'a str], n: usize) -> HashMap<&'t [&'a str], usize> {
    let mut counts = HashMap::new();
    if tokens.len() < n {
        return counts;
    }
    for window in tokens.windows(n) {
        *counts.entry(window).or_insert(0) += 1;
    }
    counts
}

/// Clipped n-gram matches and the hypothesis n-gram total (at least 1).
fn modified_precision(reference: &[&str], hypothesis: &[&str], n: usize) -> (usize, usize) {
    let hyp_counts = ngram_counts(hypothesis, n);
    let ref_counts = ngram_counts(reference, n);
    let clipped: usize = hyp_counts
        .iter()
        .map(|(ngram, &count)| count.min(ref_counts.get(ngram).copied().unwrap_or(0)))
        .sum();
    let total: usize = hyp_counts.values().sum();
    (clipped, total.max(1))
}

fn brevity_penalty(ref_len: usize, hyp_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}

/// Sentence BLEU of `hypothesis` against a single `reference`, on whitespace
/// tokens with uniform weights over 1- to 4-grams.
///
/// Higher orders are smoothed by adding one to both the match count and the
/// total (Lin and Och, 2004), so short responses that share words with the
/// reference do not collapse to zero. A hypothesis with no unigram in common
/// with the reference still scores 0.
pub fn sentence_bleu(reference: &str, hypothesis: &str) -> f64 {
    let reference: Vec<&str> = reference.split_whitespace().collect();
    let hypothesis: Vec<&str> = hypothesis.split_whitespace().collect();

    let precisions: Vec<(usize, usize)> = (1..=MAX_ORDER)
        .map(|n| modified_precision(&reference, &hypothesis, n))
        .collect();
    if precisions[0].0 == 0 {
        return 0.0;
    }

    let weight = 1.0 / MAX_ORDER as f64;
    let log_sum: f64 = precisions
        .iter()
        .enumerate()
        .map(|(i, &(matches, total))| {
            let p = if i == 0 {
                matches as f64 / total as f64
            } else {
                (matches + 1) as f64 / (total + 1) as f64
            };
            weight * p.ln()
        })
        .sum();
    brevity_penalty(reference.len(), hypothesis.len()) * log_sum.exp()
}
