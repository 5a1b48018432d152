//! Placeholder templates for compound names.
//!
//! A pattern such as `"The {a} {n}"` names substitution points with a
//! single-character tag in braces. Each tag is bound, per call, to a source
//! of replacement text: a weighted word list, a name generator, or a
//! closure.

use rand::RngCore;
use thiserror::Error;

use crate::core::weighted::WeightedSampler;

/// Upper bound on expansion passes before a pattern set is assumed to be
/// cyclic.
pub const MAX_EXPANSION_PASSES: usize = 64;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template still had placeholders after {0} expansion passes")]
    TemplateExpansionOverrun(usize),
    #[error("unknown placeholder '{{{0}}}'")]
    UnknownPlaceholder(char),
    #[error("substitution failed: {0}")]
    Substitution(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A source of replacement text for one placeholder class.
pub trait Substitution {
    fn substitute(&self, rng: &mut dyn RngCore) -> Result<String, TemplateError>;
}

impl Substitution for WeightedSampler<String> {
    fn substitute(&self, rng: &mut dyn RngCore) -> Result<String, TemplateError> {
        self.draw(rng)
            .cloned()
            .map_err(|e| TemplateError::Substitution(Box::new(e)))
    }
}

/// Wraps a closure as a [`Substitution`].
pub struct FnSubstitution<F>(pub F);

impl<F> Substitution for FnSubstitution<F>
where
    F: Fn(&mut dyn RngCore) -> Result<String, TemplateError>,
{
    fn substitute(&self, rng: &mut dyn RngCore) -> Result<String, TemplateError> {
        (self.0)(rng)
    }
}

/// A set of tag bindings that can fill any number of patterns.
#[derive(Default)]
pub struct TemplateFiller<'a> {
    bindings: Vec<(char, &'a dyn Substitution)>,
}

impl<'a> TemplateFiller<'a> {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Bind `tag` to `source`, replacing an earlier binding of the same tag.
    pub fn bind(mut self, tag: char, source: &'a dyn Substitution) -> Self {
        self.bindings.retain(|(t, _)| *t != tag);
        self.bindings.push((tag, source));
        self
    }

    pub fn fill(&self, pattern: &str, rng: &mut dyn RngCore) -> Result<String, TemplateError> {
        fill(pattern, &self.bindings, rng)
    }
}

/// Expand `pattern` until no bound placeholder remains.
///
/// Each pass replaces every bound placeholder present at its start, left
/// to right. Replacement text may itself contain placeholders; they are
/// picked up by the next pass, so passes count nesting depth. Any `{x}`
/// left once all bound tags are gone is a
/// [`TemplateError::UnknownPlaceholder`]. `{-}` is literal text.
pub fn fill(
    pattern: &str,
    bindings: &[(char, &dyn Substitution)],
    rng: &mut dyn RngCore,
) -> Result<String, TemplateError> {
    let is_bound = |tag: char| bindings.iter().any(|(t, _)| *t == tag);

    let mut text = pattern.to_string();
    let mut passes = 0;
    while placeholders(&text).any(is_bound) {
        if passes == MAX_EXPANSION_PASSES {
            return Err(TemplateError::TemplateExpansionOverrun(passes));
        }
        passes += 1;
        text = expand_pass(&text, bindings, rng)?;
    }

    let unknown = placeholders(&text).find(|tag| *tag != '-');
    match unknown {
        Some(tag) => Err(TemplateError::UnknownPlaceholder(tag)),
        None => Ok(text),
    }
}

fn expand_pass(
    text: &str,
    bindings: &[(char, &dyn Substitution)],
    rng: &mut dyn RngCore,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match placeholder_at(tail).and_then(|tag| bindings.iter().find(|(t, _)| *t == tag)) {
            Some((tag, source)) => {
                out.push_str(&source.substitute(rng)?);
                rest = &tail[2 + tag.len_utf8()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

// Tag of a `{x}` at the start of `text`.
fn placeholder_at(text: &str) -> Option<char> {
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('{'), Some(tag), Some('}')) if tag != '{' && tag != '}' => Some(tag),
        _ => None,
    }
}

/// Tags of every `{x}` in `text`, in order.
fn placeholders(text: &str) -> impl Iterator<Item = char> + '_ {
    text.char_indices()
        .filter_map(move |(i, _)| placeholder_at(&text[i..]))
}
