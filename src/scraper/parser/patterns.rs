use regex::Regex;
use std::sync::LazyLock;

/// Site-specific naming convention with its own code extractor
pub struct SiteOverride {
    pub name: &'static str,
    /// Recognises filenames following the convention
    pub shape: Regex,
    /// Returns the code and the byte offset where the literal match ended
    pub extract: fn(&str) -> Option<(String, usize)>,
}

/// Pre-compiled regex patterns for identity extraction
pub struct Patterns {
    // Resolution markers
    pub resolution_4k: Regex,

    // Flag markers, removed before code matching
    pub chinese_subs: Regex,
    pub chinese_ch: Regex, // boundaries checked by the caller
    pub uncensored: Regex,
    pub leaked: Regex,
    pub cracked: Regex,

    // General code extraction
    pub general_code: Regex,
    pub alpha_num: Regex,
    pub reshape: Regex,
    pub zero_padded: Regex,
    pub canonical: Regex,

    // Ordered, first match wins
    pub overrides: Vec<SiteOverride>,
}

static FC2_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)fc2[-_ ]*(?:ppv[-_ ]*)?(\d{5,8})").expect("Invalid fc2 code regex")
});

static TOKYO_HOT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:cz|gedo|k|n|red-|se)\d{2,4}").expect("Invalid tokyo hot code regex")
});

static DATED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{6}[-_]\d{3}").expect("Invalid dated code regex"));

fn extract_fc2(name: &str) -> Option<(String, usize)> {
    let caps = FC2_CODE.captures(name)?;
    let whole = caps.get(0)?;
    let id = caps.get(1)?;
    Some((format!("FC2-PPV-{}", id.as_str()), whole.end()))
}

fn extract_tokyo_hot(name: &str) -> Option<(String, usize)> {
    TOKYO_HOT_CODE
        .find(name)
        .map(|m| (m.as_str().to_string(), m.end()))
}

fn extract_dated(name: &str) -> Option<(String, usize)> {
    DATED_CODE
        .find(name)
        .map(|m| (m.as_str().replace('-', "_"), m.end()))
}

impl Patterns {
    pub fn new() -> Self {
        Self {
            resolution_4k: Regex::new(r"(?i)u(ltra).+hd|2160p|4k")
                .expect("Invalid resolution regex"),

            chinese_subs: Regex::new(r"中?文?字幕?").expect("Invalid chinese_subs regex"),
            chinese_ch: Regex::new(r"(?i)ch").expect("Invalid chinese_ch regex"),
            uncensored: Regex::new(r"(?i)uncen(?:s(?:or(?:ed)?)?)?|无码|無碼")
                .expect("Invalid uncensored regex"),
            leaked: Regex::new(r"(?i)leak(?:ed)?|泄漏|流出").expect("Invalid leaked regex"),
            cracked: Regex::new(r"(?i)crack(?:ed)?|破解").expect("Invalid cracked regex"),

            general_code: Regex::new(r"(?i)(?:\d{2,}[-_]\d{2,})|(?:[A-Z]+[-_]?[A-Z]*\d{2,})+")
                .expect("Invalid general_code regex"),
            alpha_num: Regex::new(r"[a-zA-Z]+\d{2,}").expect("Invalid alpha_num regex"),
            reshape: Regex::new(r"([a-zA-Z]{2,})0*?(\d{2,})").expect("Invalid reshape regex"),
            zero_padded: Regex::new(r"([a-zA-Z]{2,})-0+(\d+)").expect("Invalid zero_padded regex"),
            canonical: Regex::new(r"^[A-Za-z]{2,}-\d+$").expect("Invalid canonical regex"),

            overrides: vec![
                SiteOverride {
                    name: "fc2",
                    shape: Regex::new(r"(?i)fc2").expect("Invalid fc2 shape regex"),
                    extract: extract_fc2,
                },
                SiteOverride {
                    name: "tokyo-hot",
                    shape: Regex::new(r"(?i)tokyo.*hot").expect("Invalid tokyo hot shape regex"),
                    extract: extract_tokyo_hot,
                },
                SiteOverride {
                    name: "dated",
                    shape: Regex::new(r"(?i)carib|1pon|mura|paco")
                        .expect("Invalid dated shape regex"),
                    extract: extract_dated,
                },
            ],
        }
    }
}

impl Default for Patterns {
    fn default() -> Self {
        Self::new()
    }
}

/// Global singleton for patterns
pub static PATTERNS: LazyLock<Patterns> = LazyLock::new(Patterns::new);
