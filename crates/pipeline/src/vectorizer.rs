//! TF-IDF vectorizer over unigrams and bigrams.
//!
//! Documents are tokenized into runs of two or more word characters,
//! lowercased, stripped of English stop words, then expanded into n-grams.
//! Weights are `(1 + ln tf) * idf` with smoothed idf, and every row is
//! L2-normalized.

use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{info, instrument};

use crate::config::VectorizerConfig;
use crate::sparse::CsrMatrix;
use crate::stop_words::is_stop_word;

/// A fitted vectorizer: vocabulary (term -> column) and idf weights.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    config: VectorizerConfig,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    /// Learn the vocabulary of `documents` and return their term-weight matrix.
    ///
    /// Fails when the document-frequency bounds contradict each other or leave
    /// no term at all.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn fit_transform(config: &VectorizerConfig, documents: &[&str]) -> Result<(Self, CsrMatrix)> {
        let n_docs = documents.len();
        if n_docs == 0 {
            bail!("Cannot build a vocabulary from an empty corpus");
        }

        let analyzed: Vec<Vec<String>> = documents.iter().map(|d| analyze(config, d)).collect();

        // term -> (document frequency, corpus frequency)
        let mut stats: HashMap<&str, (usize, usize)> = HashMap::new();
        for terms in &analyzed {
            let mut seen: HashSet<&str> = HashSet::new();
            for term in terms {
                let entry = stats.entry(term.as_str()).or_insert((0, 0));
                entry.1 += 1;
                if seen.insert(term.as_str()) {
                    entry.0 += 1;
                }
            }
        }

        let max_doc_count = config.max_df * n_docs as f64;
        if max_doc_count < config.min_df as f64 {
            bail!(
                "max_df ({}) corresponds to fewer documents than min_df ({}) for {} documents",
                config.max_df,
                config.min_df,
                n_docs
            );
        }

        let mut kept: Vec<(&str, usize)> = stats
            .iter()
            .filter(|(_, (df, _))| *df >= config.min_df && (*df as f64) <= max_doc_count)
            .map(|(term, (_, tf))| (*term, *tf))
            .collect();

        let max_features = config.max_features_for(n_docs);
        if kept.len() > max_features {
            // Most frequent terms across the corpus win; ties by term
            kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            kept.truncate(max_features);
        }
        if kept.is_empty() {
            bail!("Empty vocabulary: no term satisfies the document-frequency bounds");
        }

        // Columns in term order
        let ordered: BTreeMap<&str, ()> = kept.iter().map(|(term, _)| (*term, ())).collect();
        let vocabulary: HashMap<String, usize> = ordered
            .keys()
            .enumerate()
            .map(|(col, term)| (term.to_string(), col))
            .collect();

        let mut idf = vec![0.0f64; vocabulary.len()];
        for (term, &col) in &vocabulary {
            let df = stats.get(term.as_str()).map(|(df, _)| *df).unwrap_or(0);
            idf[col] = ((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0;
        }

        let vectorizer = Self {
            config: config.clone(),
            vocabulary,
            idf,
        };
        let matrix = vectorizer.weigh(&analyzed);

        info!(
            "TF-IDF matrix shape: {:?}, sparsity {:.2}%",
            matrix.shape(),
            matrix.sparsity()
        );
        Ok((vectorizer, matrix))
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    #[cfg(test)]
    fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    fn weigh(&self, analyzed: &[Vec<String>]) -> CsrMatrix {
        let rows = analyzed
            .iter()
            .map(|terms| {
                let mut counts: HashMap<usize, f64> = HashMap::new();
                for term in terms {
                    if let Some(&col) = self.vocabulary.get(term) {
                        *counts.entry(col).or_insert(0.0) += 1.0;
                    }
                }
                let mut row: Vec<(usize, f64)> = counts
                    .into_iter()
                    .map(|(col, tf)| {
                        let tf = if self.config.sublinear_tf { 1.0 + tf.ln() } else { tf };
                        (col, tf * self.idf[col])
                    })
                    .collect();
                let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
                if norm > 0.0 {
                    for (_, w) in &mut row {
                        *w /= norm;
                    }
                }
                row
            })
            .collect();
        CsrMatrix::from_rows(self.vocabulary.len(), rows)
    }
}

/// Split into lowercase tokens of at least two word characters.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Tokens (minus stop words) expanded into the configured n-gram range.
fn analyze(config: &VectorizerConfig, text: &str) -> Vec<String> {
    let tokens: Vec<String> = tokenize(text)
        .into_iter()
        .filter(|token| !(config.stop_words && is_stop_word(token)))
        .collect();

    let (min_n, max_n) = config.ngram_range;
    let mut terms = Vec::new();
    for n in min_n.max(1)..=max_n {
        if n == 1 {
            terms.extend(tokens.iter().cloned());
        } else {
            terms.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
    }
    terms
}
