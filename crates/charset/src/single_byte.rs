//! Language-model scoring of single-byte code pages.
//!
//! Each candidate decodes the whole sample and is judged on the words that
//! contain at least one high byte: script and case consistency, how common
//! the decoded letters are for the language, and how many letter pairs are
//! common bigrams.

use crate::codepage::CodePage;
use crate::language::LanguageModel;
use crate::unicode::{has_plausible_case, is_noise, script_of, to_lower, Script};

/// Hit rate of common bigrams at which real text saturates the bigram score
const BIGRAM_SATURATION: f32 = 0.25;
const NOISE_PENALTY: f32 = 0.5;
const MAX_CONFIDENCE: f32 = 0.99;
const UNRANKED_LETTER_WEIGHT: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub code_page: CodePage,
    pub language: &'static str,
    pub confidence: f32,
}

#[derive(Debug, Default)]
struct Tally {
    high_bytes: usize,
    high_letters: usize,
    noise: usize,
    words: usize,
    plausible_words: usize,
    scored_letters: usize,
    frequency_weight: f32,
    pairs: usize,
    bigram_hits: usize,
}

pub(crate) fn score(sample: &[u8], model: &LanguageModel, code_page: CodePage) -> Candidate {
    let bigrams = model.bigram_pairs();
    let mut tally = Tally::default();
    let mut word: Vec<(char, bool)> = Vec::new();

    for &byte in sample {
        let c = code_page.decode(byte);
        let high = byte >= 0x80;
        if high {
            tally.high_bytes += 1;
            if is_noise(c) {
                tally.noise += 1;
            } else if script_of(c) == model.script {
                tally.high_letters += 1;
            }
        }
        if c.is_alphabetic() {
            word.push((c, high));
        } else {
            tally.flush_word(&word, model, &bigrams);
            word.clear();
        }
    }
    tally.flush_word(&word, model, &bigrams);

    Candidate {
        code_page,
        language: model.name,
        confidence: tally.confidence(!bigrams.is_empty()),
    }
}

impl Tally {
    fn flush_word(&mut self, word: &[(char, bool)], model: &LanguageModel, bigrams: &[(char, char)]) {
        let high_count = word.iter().filter(|(_, high)| *high).count();
        if high_count == 0 {
            return;
        }
        self.words += 1;

        let letters: Vec<char> = word.iter().map(|(c, _)| *c).collect();
        let script_ok = letters.iter().all(|&c| match model.script {
            Script::Latin => c.is_ascii() || script_of(c) == Script::Latin,
            script => !c.is_ascii() && script_of(c) == script,
        });
        // Latin-script languages sprinkle accents into mostly ASCII words.
        let density_ok = model.script != Script::Latin || high_count * 2 <= word.len() + 1;
        if !(script_ok && density_ok && has_plausible_case(&letters)) {
            return;
        }
        self.plausible_words += 1;

        for &(c, high) in word {
            if !high {
                continue;
            }
            self.scored_letters += 1;
            self.frequency_weight += match model.frequency_rank(to_lower(c)) {
                Some(rank) => rank_weight(rank),
                None => UNRANKED_LETTER_WEIGHT,
            };
        }

        for pair in word.windows(2) {
            let ((a, a_high), (b, b_high)) = (pair[0], pair[1]);
            if !(a_high || b_high) {
                continue;
            }
            self.pairs += 1;
            if bigrams.contains(&(to_lower(a), to_lower(b))) {
                self.bigram_hits += 1;
            }
        }
    }

    fn confidence(&self, uses_bigrams: bool) -> f32 {
        if self.high_bytes == 0 || self.words == 0 {
            return 0.0;
        }
        let letter_ratio = self.high_letters as f32 / self.high_bytes as f32;
        let word_ratio = self.plausible_words as f32 / self.words as f32;
        let frequency = if self.scored_letters == 0 {
            0.0
        } else {
            self.frequency_weight / self.scored_letters as f32
        };
        let quality = if uses_bigrams {
            let bigram = if self.pairs == 0 {
                frequency
            } else {
                (self.bigram_hits as f32 / self.pairs as f32 / BIGRAM_SATURATION).min(1.0)
            };
            0.5 * frequency + 0.5 * bigram
        } else {
            frequency
        };

        let mut confidence = letter_ratio * word_ratio * quality;
        if self.noise > 0 {
            confidence *= NOISE_PENALTY;
        }
        confidence.min(MAX_CONFIDENCE)
    }
}

fn rank_weight(rank: usize) -> f32 {
    match rank {
        0..=7 => 1.0,
        8..=15 => 0.7,
        16..=23 => 0.4,
        _ => 0.15,
    }
}
