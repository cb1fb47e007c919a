/*!
 * Detection of lines that came back untranslated.
 *
 * Validators are chosen per target language. A suspect line is retried once
 * in a follow-up request; the retry answer replaces the first one only when
 * no validator flags it.
 */

use once_cell::sync::Lazy;
use regex::Regex;

use crate::language_utils;

/// Checks one translated line against its source
pub trait LineValidator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Whether `translated` looks like it was left in the source language
    fn is_suspect(&self, original: &str, translated: &str) -> bool;
}

static BRACKETED_ONLY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\s*(\[[^\]]*\]|\([^)]*\)|♪+|-)\s*)+$").expect("bracketed regex is valid")
});

static LETTERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}{2,}").expect("letter regex is valid"));

/// Whether a line carries words worth translating at all
fn has_translatable_words(text: &str) -> bool {
    !BRACKETED_ONLY.is_match(text) && LETTERS.find_iter(text).count() >= 2
}

/// Flags translations identical to their source
#[derive(Debug, Default)]
pub struct IdenticalTextValidator;

impl LineValidator for IdenticalTextValidator {
    fn name(&self) -> &str {
        "identical-text"
    }

    fn is_suspect(&self, original: &str, translated: &str) -> bool {
        has_translatable_words(original) && original.trim() == translated.trim()
    }
}

static CZECH_DIACRITICS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[áčďéěíňóřšťúůýžÁČĎÉĚÍŇÓŘŠŤÚŮÝŽ]").expect("diacritics regex is valid")
});

static ENGLISH_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(the|and|you|your|what|this|that|with|have|are|is|was|were|don't|can't|i'm|it's|we|they|there|here|just|not|will|would|know)\b")
        .expect("english words regex is valid")
});

/// Czech output without any diacritics but with common English words
#[derive(Debug, Default)]
pub struct CzechValidator;

impl LineValidator for CzechValidator {
    fn name(&self) -> &str {
        "czech"
    }

    fn is_suspect(&self, original: &str, translated: &str) -> bool {
        if !has_translatable_words(original) || translated.chars().count() < 12 {
            return false;
        }
        !CZECH_DIACRITICS.is_match(translated) && ENGLISH_WORDS.find_iter(translated).count() >= 2
    }
}

/// Validators for a target language
pub fn validators_for(target_language: &str) -> Vec<Box<dyn LineValidator>> {
    let mut validators: Vec<Box<dyn LineValidator>> = vec![Box::new(IdenticalTextValidator)];
    if language_utils::language_codes_match(target_language, "cs") {
        validators.push(Box::new(CzechValidator));
    }
    validators
}

/// Positions in a batch whose translation any validator rejects
pub fn suspect_positions<S: AsRef<str>>(
    validators: &[Box<dyn LineValidator>],
    originals: &[S],
    translated: &[String],
) -> Vec<usize> {
    originals
        .iter()
        .zip(translated)
        .enumerate()
        .filter(|(_, (original, text))| validators.iter().any(|v| v.is_suspect(original.as_ref(), text)))
        .map(|(i, _)| i)
        .collect()
}
