/*!
 * Show and episode detection from subtitle file names.
 *
 * Release noise is stripped first, then an ordered list of patterns is tried;
 * the first one that matches decides title, season, episode and year.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

/// Title and episode coordinates derived from a file name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShowInfo {
    pub title: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub year: Option<u32>,
}

impl ShowInfo {
    /// Bare title without any episode coordinates
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Normalized research cache key: lower-cased title plus year when known
    pub fn research_key(&self) -> String {
        let title = self.title.trim().to_lowercase();
        match self.year {
            Some(year) => format!("{} ({})", title, year),
            None => title,
        }
    }

    /// Human readable label, e.g. `Dark S01E03`
    pub fn label(&self) -> String {
        match (self.season, self.episode) {
            (Some(s), Some(e)) => format!("{} S{:02}E{:02}", self.title, s, e),
            _ => match self.year {
                Some(year) => format!("{} ({})", self.title, year),
                None => self.title.clone(),
            },
        }
    }
}

static EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\.(srt|vtt|ass|ssa|sub|txt)$").expect("extension regex is valid")
});

static BRACKETED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\]|\{[^}]*\}|\(([^)]*)\)").expect("bracket regex is valid")
});

static RELEASE_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(2160p|1080p|1080i|720p|576p|480p|4k|uhd|hdr10?|x\.?26[45]|h\.?26[45]|hevc|avc|xvid|divx|10bit|aac(2\.0)?|ac3|eac3|dts|ddp?5\.1|atmos|web[\s.-]?dl|web[\s.-]?rip|webrip|web|bluray|blu-ray|brrip|bdrip|hdtv|hdrip|dvdrip|dvd|amzn|nf|dsnp|hulu|hmax|atvp|proper|repack|extended|internal|multi|subs?)\b",
    )
    .expect("release noise regex is valid")
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[._]+").expect("separator regex is valid"));
static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").expect("space regex is valid"));
static BARE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(?:19|20)\d{2}$").expect("year regex is valid"));
static TRAILING_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?)[\s-]+((?:19|20)\d{2})$").expect("trailing year regex is valid")
});

/// How a pattern's capture groups map onto `ShowInfo`
#[derive(Debug, Clone, Copy)]
enum PatternKind {
    SeasonEpisode,
    Year,
}

// First match wins
static PATTERNS: Lazy<Vec<(Regex, PatternKind)>> = Lazy::new(|| {
    [
        (r"(?i)^(.*?)[\s-]*\bS(\d{1,2})[\s.-]*E(\d{1,3})\b", PatternKind::SeasonEpisode),
        (r"(?i)^(.*?)[\s-]*\b(\d{1,2})x(\d{2,3})\b", PatternKind::SeasonEpisode),
        (r"(?i)^(.*?)[\s-]*\bSeason\s*(\d{1,2})[\s,-]*Episode\s*(\d{1,3})\b", PatternKind::SeasonEpisode),
        (r"^(.*?)[\s-]*\b((?:19|20)\d{2})\b", PatternKind::Year),
    ]
    .into_iter()
    .map(|(pattern, kind)| (Regex::new(pattern).expect("show info pattern is valid"), kind))
    .collect()
});

/// Strip extension, bracketed groups and release tags.
///
/// A parenthesized bare year is kept since it disambiguates titles.
fn clean_file_name(file_name: &str) -> String {
    let without_ext = EXTENSION.replace(file_name.trim(), "");
    let without_groups = BRACKETED.replace_all(&without_ext, |caps: &Captures| {
        match caps.get(1).map(|m| m.as_str().trim()) {
            Some(inner) if BARE_YEAR.is_match(inner) => format!(" {} ", inner),
            _ => " ".to_string(),
        }
    });
    let spaced = SEPARATORS.replace_all(&without_groups, " ");
    let denoised = RELEASE_NOISE.replace_all(&spaced, " ");
    tidy(&denoised)
}

fn tidy(text: &str) -> String {
    SPACES
        .replace_all(text, " ")
        .trim_matches(|c: char| c.is_whitespace() || c == '-')
        .to_string()
}

fn number(caps: &Captures, group: usize) -> Option<u32> {
    caps.get(group).and_then(|m| m.as_str().parse().ok())
}

/// Derive title, season, episode and year from a file name. Never fails.
pub fn extract_show_info(file_name: &str) -> ShowInfo {
    let cleaned = clean_file_name(file_name);

    for (pattern, kind) in PATTERNS.iter() {
        let Some(caps) = pattern.captures(&cleaned) else {
            continue;
        };
        let title = caps.get(1).map(|m| tidy(m.as_str())).unwrap_or_default();

        let mut info = match kind {
            PatternKind::SeasonEpisode => ShowInfo {
                title,
                season: number(&caps, 2),
                episode: number(&caps, 3),
                year: None,
            },
            PatternKind::Year => ShowInfo {
                title,
                year: number(&caps, 2),
                ..Default::default()
            },
        };

        // "Show 2019 S01E02": the year sits in front of the episode marker
        if info.year.is_none() {
            if let Some(year_caps) = TRAILING_YEAR.captures(&info.title) {
                let year = number(&year_caps, 2);
                info.title = tidy(&year_caps[1]);
                info.year = year;
            }
        }

        if info.title.is_empty() {
            // Patterns matched at the very start; fall back to the cleaned name
            info.title = cleaned.clone();
        }
        return info;
    }

    if cleaned.is_empty() {
        ShowInfo::titled("Unknown")
    } else {
        ShowInfo::titled(cleaned)
    }
}
