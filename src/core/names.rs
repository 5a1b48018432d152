//! Phonetic name synthesis.
//!
//! Names are split into segments, maximal runs of vowels or of consonants,
//! and a first-order Markov chain is trained over those segments. A name's
//! corpus frequency is added to the weight of each of its transitions, so
//! common names shape the output more than rare ones.

use rand::{Rng, RngCore};
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::core::template::{Substitution, TemplateError};
use crate::core::weighted::{SamplerError, WeightedSampler};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("name corpus produced no transitions")]
    EmptyModel,
    #[error(transparent)]
    Sampler(#[from] SamplerError),
}

const VOWELS: &[char] = &['A', 'E', 'I', 'O', 'U', 'Y'];

fn is_vowel(c: char) -> bool {
    VOWELS.contains(&c.to_ascii_uppercase())
}

fn is_q(c: char) -> bool {
    c.eq_ignore_ascii_case(&'q')
}

/// Split a name into vowel runs and consonant runs, preserving case.
///
/// A Q directly followed by a vowel opens that vowel run (`Squire` is
/// `S`, `qui`, `r`, `e`). Characters other than letters are dropped.
pub fn segment(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().filter(|c| c.is_alphabetic()).collect();
    let n = chars.len();
    let starts_vowel_run = |i: usize| {
        is_vowel(chars[i]) || (is_q(chars[i]) && i + 1 < n && is_vowel(chars[i + 1]))
    };

    let mut segments = Vec::new();
    let mut i = 0;
    while i < n {
        let start = i;
        if starts_vowel_run(i) {
            if is_q(chars[i]) {
                i += 1;
            }
            while i < n && is_vowel(chars[i]) {
                i += 1;
            }
        } else {
            while i < n && !starts_vowel_run(i) {
                i += 1;
            }
        }
        segments.push(chars[start..i].iter().collect());
    }
    segments
}

/// Read `name:frequency` pairs out of free-form text.
///
/// Any character that is not alphanumeric, `_` or `:` separates tokens.
/// Tokens without a positive integer frequency are ignored.
pub fn parse_corpus(text: &str) -> Vec<(String, u32)> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == ':'))
        .filter_map(|token| {
            let (name, freq) = token.split_once(':')?;
            let freq: u32 = freq.parse().ok()?;
            (!name.is_empty() && freq > 0).then(|| (name.to_string(), freq))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Token {
    Start,
    Segment(String),
    End,
}

/// Markov model over name segments. Immutable once built.
#[derive(Debug, Clone)]
pub struct PhoneticNameSynthesizer {
    transitions: FxHashMap<Token, WeightedSampler<Token>>,
}

impl PhoneticNameSynthesizer {
    /// Train on `(name, frequency)` pairs.
    pub fn from_corpus<I, S>(corpus: I) -> Result<Self, NameError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        // Successors kept in first-seen order so seeded output is stable.
        let mut counts: FxHashMap<Token, Vec<(Token, u32)>> = FxHashMap::default();

        for (name, weight) in corpus {
            let segments = segment(name.as_ref());
            if weight == 0 || segments.is_empty() {
                continue;
            }
            let mut chain = Vec::with_capacity(segments.len() + 2);
            chain.push(Token::Start);
            chain.extend(segments.into_iter().map(Token::Segment));
            chain.push(Token::End);

            for pair in chain.windows(2) {
                add_transition(&mut counts, &pair[0], &pair[1], weight);
            }
        }

        if counts.is_empty() {
            return Err(NameError::EmptyModel);
        }

        let mut transitions = FxHashMap::default();
        for (from, successors) in counts {
            let weighted = successors.into_iter().map(|(to, count)| (count, to));
            transitions.insert(from, WeightedSampler::from_weighted(weighted)?);
        }
        Ok(Self { transitions })
    }

    /// Train on `name:frequency` text.
    pub fn from_corpus_text(text: &str) -> Result<Self, NameError> {
        Self::from_corpus(parse_corpus(text))
    }

    /// Number of distinct `from -> to` transitions.
    pub fn transition_count(&self) -> usize {
        self.transitions.values().map(WeightedSampler::len).sum()
    }

    /// Generate a name of at most `target_segments` segments, stopping
    /// early if the chain reaches a name ending. `None` picks 2 or 3.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        target_segments: Option<usize>,
        rng: &mut R,
    ) -> Result<String, NameError> {
        let target = target_segments
            .unwrap_or_else(|| rng.gen_range(2..=3))
            .max(1);

        let mut name = String::new();
        let mut current = &Token::Start;
        let mut emitted = 0;
        while emitted < target {
            let Some(next) = self.transitions.get(current) else {
                break;
            };
            let drawn = next.draw(rng)?;
            match drawn {
                Token::Segment(text) => {
                    name.push_str(text);
                    emitted += 1;
                    current = drawn;
                }
                Token::End | Token::Start => break,
            }
        }

        if name.is_empty() {
            return Err(NameError::EmptyModel);
        }
        Ok(name)
    }
}

fn add_transition(
    counts: &mut FxHashMap<Token, Vec<(Token, u32)>>,
    from: &Token,
    to: &Token,
    weight: u32,
) {
    let successors = counts.entry(from.clone()).or_default();
    match successors.iter_mut().find(|(t, _)| t == to) {
        Some((_, count)) => *count = count.saturating_add(weight),
        None => successors.push((to.clone(), weight)),
    }
}

/// Upper-case the first letter and lower-case the rest.
pub fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Person names built from a given-name model and a family-name model.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    given: PhoneticNameSynthesizer,
    family: PhoneticNameSynthesizer,
}

impl NameGenerator {
    pub fn new(given: PhoneticNameSynthesizer, family: PhoneticNameSynthesizer) -> Self {
        Self { given, family }
    }

    /// Train both models from `name:frequency` corpora.
    pub fn from_corpus_text(given: &str, family: &str) -> Result<Self, NameError> {
        Ok(Self::new(
            PhoneticNameSynthesizer::from_corpus_text(given)?,
            PhoneticNameSynthesizer::from_corpus_text(family)?,
        ))
    }

    pub fn given_name<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, NameError> {
        Ok(capitalize(&self.given.generate(None, rng)?))
    }

    pub fn family_name<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, NameError> {
        Ok(capitalize(&self.family.generate(None, rng)?))
    }

    /// `"Given Family"`.
    pub fn full_name<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<String, NameError> {
        let given = self.given_name(rng)?;
        let family = self.family_name(rng)?;
        Ok(format!("{} {}", given, family))
    }

    pub fn names<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Result<Vec<String>, NameError> {
        (0..count).map(|_| self.full_name(rng)).collect()
    }
}

impl Substitution for NameGenerator {
    fn substitute(&self, rng: &mut dyn RngCore) -> Result<String, TemplateError> {
        self.full_name(rng)
            .map_err(|e| TemplateError::Substitution(Box::new(e)))
    }
}
