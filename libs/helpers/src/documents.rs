use rand::{self, seq::SliceRandom, Rng, RngCore};
use rand_distr::{Distribution, Poisson};
use std::collections::HashSet;

const SYLLABLES: [&str; 16] = [
    "ba", "ko", "ri", "tu", "me", "sa", "lo", "ne", "dé", "ça", "vi", "gu", "pa", "zé", "ho",
    "ly",
];

pub struct TestDocument {
    /// Surface forms
    pub words: Vec<String>,
    /// Lower-cased forms
    pub lemmas: Vec<String>,
    /// A few title words (indexed without positions)
    pub title: Vec<String>,
}

/// Creates distinct random words, some of them capitalized or with
/// diacritics, so that both collation sensitivities matter
pub fn create_vocabulary(size: usize, rng: &mut dyn RngCore) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut vocabulary = Vec::with_capacity(size);

    while vocabulary.len() < size {
        let syllables = rng.gen_range(1..4);
        let mut word: String = (0..syllables)
            .map(|_| *SYLLABLES.choose(rng).unwrap())
            .collect();
        if rng.gen_bool(0.2) {
            let mut chars = word.chars();
            let first = chars.next().unwrap();
            word = first.to_uppercase().chain(chars).collect();
        }
        if seen.insert(word.clone()) {
            vocabulary.push(word);
        }
    }

    vocabulary
}

pub fn create_document(
    lambda_words: f64,
    vocabulary: &[String],
    rng: &mut dyn RngCore,
) -> TestDocument {
    let poi = Poisson::new(lambda_words).unwrap();
    let num_words = poi.sample(rng) as usize;

    let words: Vec<String> = (0..num_words)
        .map(|_| vocabulary.choose(rng).unwrap().clone())
        .collect();
    let lemmas = words.iter().map(|w| w.to_lowercase()).collect();
    let title = words.iter().take(3).cloned().collect();

    TestDocument {
        words,
        lemmas,
        title,
    }
}
