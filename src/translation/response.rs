/*!
 * Parsing of numbered batch responses.
 *
 * A response is either a set of numbered lines (possibly with gaps, repaired
 * positionally) or malformed text that maps onto nothing.
 */

use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::translation::prompts::decode_line;

static NUMBERED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*[.:)]\s*(.*)$").expect("numbered response regex is valid")
});

/// Lines recovered from a response, one slot per batch position
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLines {
    /// Translation per position; `None` where the response had nothing
    pub lines: Vec<Option<String>>,
    /// Slots filled by position because the line had no usable number
    pub positional: usize,
}

/// Result of parsing a batch response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    Numbered(ParsedLines),
    Malformed(String),
}

/// Texts for a batch after repair
#[derive(Debug, Clone, PartialEq)]
pub struct RepairedBatch {
    pub texts: Vec<String>,
    /// Positions that kept their original text
    pub missing: Vec<usize>,
    /// Positions filled by positional alignment
    pub positional: usize,
}

impl RepairedBatch {
    /// Lines that needed any repair
    pub fn repaired_lines(&self) -> usize {
        self.missing.len() + self.positional
    }
}

fn is_noise(line: &str) -> bool {
    line.is_empty() || line.starts_with("```")
}

/// Parse a response to a batch of `expected` numbered lines
pub fn parse_batch_response(response: &str, expected: usize) -> ParsedResponse {
    let mut lines: Vec<Option<String>> = vec![None; expected];
    let mut positional = 0;
    let mut mapped = 0;

    let output_lines: Vec<&str> = response.lines().map(str::trim).filter(|l| !is_noise(l)).collect();
    let mut unnumbered = Vec::new();

    // Numbered lines first, so leading chatter cannot take a numbered slot
    for (k, line) in output_lines.iter().enumerate() {
        let numbered = NUMBERED.captures(line).and_then(|caps| {
            let n: usize = caps[1].parse().ok()?;
            (1..=expected).contains(&n).then(|| (n - 1, caps[2].trim().to_string()))
        });

        match numbered {
            Some((slot, text)) if lines[slot].is_none() => {
                lines[slot] = Some(text);
                mapped += 1;
            }
            Some(_) => debug!("Duplicate number in response line {}: '{}'", k + 1, line),
            None => unnumbered.push(k),
        }
    }

    for k in unnumbered {
        if k < expected && lines[k].is_none() {
            lines[k] = Some(output_lines[k].to_string());
            positional += 1;
            mapped += 1;
        } else {
            debug!("Dropping unmatched response line {}: '{}'", k + 1, output_lines[k]);
        }
    }

    if mapped == 0 {
        return ParsedResponse::Malformed(response.to_string());
    }

    ParsedResponse::Numbered(ParsedLines { lines, positional })
}

impl ParsedLines {
    /// Fill gaps with the original text and restore line breaks
    pub fn repair<S: AsRef<str>>(self, originals: &[S]) -> RepairedBatch {
        let mut missing = Vec::new();
        let texts = originals
            .iter()
            .enumerate()
            .map(|(i, original)| {
                match self.lines.get(i).and_then(|l| l.as_deref()).filter(|t| !t.trim().is_empty()) {
                    Some(text) => decode_line(text),
                    None => {
                        missing.push(i);
                        original.as_ref().to_string()
                    }
                }
            })
            .collect();

        RepairedBatch {
            texts,
            missing,
            positional: self.positional,
        }
    }
}
