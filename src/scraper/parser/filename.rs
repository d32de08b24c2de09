use super::noise::NoiseRule;
use super::patterns::{PATTERNS, Patterns};
use crate::scraper::types::Identity;
use crate::scraper::{Result, ScraperError};
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Code, episode and flags extracted from one candidate string
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CodeMatch {
    code: String,
    episode: Option<String>,
    is_chinese_subtitle: bool,
    is_uncensored: bool,
    is_leaked: bool,
    is_cracked: bool,
}

impl CodeMatch {
    /// Reconcile a trailing suffix with the episode found behind the code
    fn with_suffix(mut self, suffix: String) -> Self {
        self.episode = match self.episode.take() {
            Some(per_code) if suffix == "C" && per_code != "C" => {
                self.is_chinese_subtitle = true;
                Some(per_code)
            }
            Some(per_code) if per_code == "C" && suffix != "C" => {
                self.is_chinese_subtitle = true;
                Some(suffix)
            }
            Some(per_code) => Some(per_code),
            None => Some(suffix),
        };
        self
    }
}

/// Extracts an [`Identity`] from release filenames
#[derive(Debug, Clone, Default)]
pub struct Parser {
    noise_rules: Vec<NoiseRule>,
}

impl Parser {
    #[must_use]
    pub const fn new(noise_rules: Vec<NoiseRule>) -> Self {
        Self { noise_rules }
    }

    /// Parse a file path; the extension is stripped first
    pub fn parse_path(&self, path: &Path) -> Result<Identity> {
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(|| {
            ScraperError::Input(format!("no usable file name in {}", path.display()))
        })?;

        self.parse(stem)
    }

    /// Parse a bare filename (no extension).
    ///
    /// An unrecognisable name yields an identity with an empty code; only an
    /// empty or whitespace-only name is an error.
    pub fn parse(&self, name: &str) -> Result<Identity> {
        if name.trim().is_empty() {
            return Err(ScraperError::Input("empty file name".to_string()));
        }

        let patterns = &*PATTERNS;
        let cleaned = self.remove_noise(name);
        let (is_4k, working) = strip_4k(&cleaned, patterns);

        let found = match split_suffix(&working) {
            Some((suffix, trimmed)) => {
                let found = extract_code(trimmed, patterns);
                if found.code.is_empty() {
                    // The suffix was part of the code, start over on the whole string
                    extract_code(&working, patterns)
                } else {
                    found.with_suffix(suffix)
                }
            }
            None => extract_code(&working, patterns),
        };

        let mut identity = Identity::new(found.code);
        identity.episode = found.episode;
        identity.is_chinese_subtitle = found.is_chinese_subtitle || identity.episode_is("C");
        identity.is_uncensored = found.is_uncensored;
        identity.is_leaked = found.is_leaked;
        identity.is_cracked = found.is_cracked;
        identity.is_4k = is_4k;

        debug!(
            name,
            code = identity.code(),
            episode = ?identity.episode,
            "parsed identity"
        );

        Ok(identity)
    }

    fn remove_noise(&self, name: &str) -> String {
        self.noise_rules
            .iter()
            .fold(name.to_string(), |acc, rule| rule.apply(&acc))
    }
}

fn strip_4k(name: &str, patterns: &Patterns) -> (bool, String) {
    if patterns.resolution_4k.is_match(name) {
        let stripped = patterns.resolution_4k.replace_all(name, "");
        (true, stripped.into_owned())
    } else {
        (false, name.to_string())
    }
}

/// Split a trailing episode suffix: a 1-2 digit run, or a lone letter
fn split_suffix(name: &str) -> Option<(String, &str)> {
    let digits = name.bytes().rev().take_while(u8::is_ascii_digit).count();
    if (1..=2).contains(&digits) {
        let at = name.len() - digits;
        return Some((name[at..].to_string(), &name[..at]));
    }
    if digits > 0 {
        return None;
    }

    let mut chars = name.chars().rev();
    let last = chars.next()?;
    if !last.is_ascii_alphabetic() || chars.next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let at = name.len() - last.len_utf8();
    Some((last.to_ascii_uppercase().to_string(), &name[..at]))
}

fn extract_code(name: &str, patterns: &Patterns) -> CodeMatch {
    let mut found = CodeMatch {
        is_chinese_subtitle: find_ch_marker(name, patterns).is_some()
            || patterns.chinese_subs.is_match(name),
        is_uncensored: patterns.uncensored.is_match(name),
        is_leaked: patterns.leaked.is_match(name),
        is_cracked: patterns.cracked.is_match(name),
        ..Default::default()
    };
    let clean = strip_markers(name, patterns);

    for site in &patterns.overrides {
        if !site.shape.is_match(&clean) {
            continue;
        }
        if let Some((code, end)) = (site.extract)(&clean) {
            debug!(site = site.name, code = %code, "site naming convention matched");
            let (episode, is_cn) = episode_after(&clean[end..]);
            found.code = code;
            found.episode = episode;
            found.is_chinese_subtitle |= is_cn;
            return found;
        }
    }

    // Shortest candidate wins. Known to misfire when noise outranks the code.
    let Some(candidate) = patterns
        .general_code
        .find_iter(&clean)
        .min_by_key(|m| m.len())
    else {
        if patterns.canonical.is_match(&clean) {
            found.code = strip_zero_padding(&clean, patterns);
        }
        return found;
    };

    let mut code = candidate.as_str().to_string();
    if !code.contains('-')
        && let Some(m) = patterns.alpha_num.find(&code)
    {
        code = m.as_str().to_string();
        if !is_brand_exception(&code) {
            code = patterns.reshape.replace_all(&code, "${1}-${2}").into_owned();
        }
    }

    let (episode, is_cn) = episode_after(&clean[candidate.end()..]);
    found.code = strip_zero_padding(&code, patterns);
    found.episode = episode;
    found.is_chinese_subtitle |= is_cn;
    found
}

fn strip_zero_padding(code: &str, patterns: &Patterns) -> String {
    if is_brand_exception(code) {
        return code.to_string();
    }
    patterns
        .zero_padded
        .replacen(code, 1, "${1}-${2}")
        .into_owned()
}

fn is_brand_exception(code: &str) -> bool {
    code.to_ascii_lowercase().contains("heyzo")
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `ch` not preceded by a letter and ending at a word boundary
fn find_ch_marker(name: &str, patterns: &Patterns) -> Option<Range<usize>> {
    patterns
        .chinese_ch
        .find_iter(name)
        .find(|m| {
            let before = name[..m.start()].chars().next_back();
            let after = name[m.end()..].chars().next();
            !before.is_some_and(|c| c.is_ascii_alphabetic()) && !after.is_some_and(is_word_char)
        })
        .map(|m| m.range())
}

fn strip_markers(name: &str, patterns: &Patterns) -> String {
    let mut out = name.to_string();
    while let Some(range) = find_ch_marker(&out, patterns) {
        out.replace_range(range, "");
    }
    for marker in [
        &patterns.chinese_subs,
        &patterns.uncensored,
        &patterns.leaked,
        &patterns.cracked,
    ] {
        while let Some(range) = marker.find(&out).map(|m| m.range()) {
            out.replace_range(range, "");
        }
    }
    out
}

/// Episode marker following the code: `-X` for a letter part and/or a
/// later `-…N` word carrying a single-digit part. A `C` letter next to a
/// digit part means Chinese subtitles.
fn episode_after(rest: &str) -> (Option<String>, bool) {
    let chars: Vec<char> = rest.chars().collect();

    let letter = match chars.as_slice() {
        ['-', c, tail @ ..]
            if c.is_ascii_alphabetic() && !tail.first().is_some_and(|n| is_word_char(*n)) =>
        {
            Some(c.to_ascii_uppercase())
        }
        _ => None,
    };

    let digit = chars
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == '-')
        .find_map(|(i, _)| {
            let run: Vec<char> = chars[i + 1..]
                .iter()
                .copied()
                .take_while(|c| is_word_char(*c))
                .collect();
            (0..run.len())
                .rev()
                .find(|&j| {
                    run[j].is_ascii_digit() && run.get(j + 1).is_none_or(|n| !n.is_ascii_digit())
                })
                .map(|j| run[j])
        });

    match (digit, letter) {
        (Some(d), Some('C')) => (Some(d.to_string()), true),
        (Some(d), _) => (Some(d.to_string()), false),
        (None, Some(l)) => (Some(l.to_string()), false),
        (None, None) => (None, false),
    }
}
