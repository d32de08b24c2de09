use crate::scraper::types::{ImageRef, MetadataRecord};
use crate::scraper::{Result, ScraperError};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})[-/.年](\d{1,2})[-/.月](\d{1,2})").expect("Invalid date regex")
});

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("Invalid digits regex"));

/// Record field an expression fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Number,
    Title,
    Plot,
    Actors,
    ReleaseDate,
    Duration,
    Studio,
    Label,
    Series,
    Director,
    Genres,
    Cover,
    Poster,
    SampleImages,
}

/// Label element an expression is anchored on
#[derive(Debug, Clone)]
struct Anchor {
    selector: Selector,
    label: String,
    /// Read the siblings after the label instead of a scoped selector
    following: bool,
}

/// Compiled extraction expression.
///
/// `selector@attr` reads an attribute instead of the text. Anchored
/// expressions start from elements whose own text contains a label:
/// `labelled` evaluates the value selector inside the label element, then
/// inside its parent (`<div><strong>Studio:</strong><span>X</span></div>`);
/// `following` reads the siblings after the label up to the next `<br>`
/// (`<b>Studio</b>: <a>X</a><br>`); `containing` takes the label element's
/// own text.
#[derive(Debug, Clone)]
pub struct Expr {
    anchor: Option<Anchor>,
    selector: Option<Selector>,
    attr: Option<String>,
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| ScraperError::Config(format!("invalid selector `{css}`: {e:?}")))
}

fn own_text(element: ElementRef<'_>) -> String {
    element
        .children()
        .filter_map(|n| n.value().as_text().map(|t| &**t))
        .collect()
}

impl Expr {
    pub fn parse(expr: &str) -> Result<Self> {
        let (css, attr) = match expr.rsplit_once('@') {
            Some((css, attr)) if !attr.is_empty() && !attr.contains([' ', ']']) => {
                (css, Some(attr.to_string()))
            }
            _ => (expr, None),
        };

        Ok(Self {
            anchor: None,
            selector: Some(selector(css)?),
            attr,
        })
    }

    pub fn labelled(label_css: &str, label: &str, value: &str) -> Result<Self> {
        let mut expr = Self::parse(value)?;
        expr.anchor = Some(Anchor {
            selector: selector(label_css)?,
            label: label.to_string(),
            following: false,
        });
        Ok(expr)
    }

    /// The text of the label element itself
    pub fn containing(label_css: &str, label: &str) -> Result<Self> {
        Ok(Self {
            anchor: Some(Anchor {
                selector: selector(label_css)?,
                label: label.to_string(),
                following: false,
            }),
            selector: None,
            attr: None,
        })
    }

    /// Without a value selector the sibling text is joined and trimmed of `:`
    pub fn following(label_css: &str, label: &str, value: Option<&str>) -> Result<Self> {
        let mut expr = match value {
            Some(value) => Self::parse(value)?,
            None => Self {
                anchor: None,
                selector: None,
                attr: None,
            },
        };
        expr.anchor = Some(Anchor {
            selector: selector(label_css)?,
            label: label.to_string(),
            following: true,
        });
        Ok(expr)
    }

    fn value_of(&self, element: ElementRef<'_>) -> Option<String> {
        let value = match &self.attr {
            Some(attr) => element.value().attr(attr)?.trim().to_string(),
            None => element.text().collect::<String>().trim().to_string(),
        };
        (!value.is_empty()).then_some(value)
    }

    fn select_in(&self, element: ElementRef<'_>) -> Vec<String> {
        self.selector.as_ref().map_or_else(Vec::new, |sel| {
            element
                .select(sel)
                .filter_map(|e| self.value_of(e))
                .collect()
        })
    }

    fn scoped_values(&self, label: ElementRef<'_>) -> Vec<String> {
        if self.selector.is_none() {
            return self.value_of(label).into_iter().collect();
        }

        let inner = self.select_in(label);
        if !inner.is_empty() {
            return inner;
        }
        label
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| self.select_in(parent))
            .unwrap_or_default()
    }

    fn following_values(&self, label: ElementRef<'_>, anchor: &Anchor) -> Vec<String> {
        let mut values = Vec::new();
        let mut text = String::new();

        for node in label.next_siblings() {
            if let Some(sibling) = ElementRef::wrap(node) {
                if sibling.value().name() == "br" || anchor.selector.matches(&sibling) {
                    break;
                }
                match &self.selector {
                    Some(sel) if sel.matches(&sibling) => values.extend(self.value_of(sibling)),
                    Some(_) => values.extend(self.select_in(sibling)),
                    None => text.extend(sibling.text()),
                }
            } else if let Some(t) = node.value().as_text()
                && self.selector.is_none()
            {
                text.push_str(t);
            }
        }

        if self.selector.is_none() {
            let trimmed = text.trim_matches(|c: char| c == ':' || c == '：' || c.is_whitespace());
            if !trimmed.is_empty() {
                values.push(trimmed.to_string());
            }
        }
        values
    }

    /// Every non-empty value in document order
    pub fn values(&self, doc: &Html) -> Vec<String> {
        let Some(anchor) = &self.anchor else {
            return self.select_in(doc.root_element());
        };

        doc.select(&anchor.selector)
            .filter(|el| own_text(*el).contains(anchor.label.as_str()))
            .flat_map(|el| {
                if anchor.following {
                    self.following_values(el, anchor)
                } else {
                    self.scoped_values(el)
                }
            })
            .collect()
    }

    pub fn first(&self, doc: &Html) -> Option<String> {
        self.values(doc).into_iter().next()
    }
}

/// Text to unix seconds (midnight UTC); 0 when nothing parses
pub fn parse_date(text: &str) -> i64 {
    DATE.captures(text)
        .and_then(|caps| {
            let date = NaiveDate::from_ymd_opt(
                caps[1].parse().ok()?,
                caps[2].parse().ok()?,
                caps[3].parse().ok()?,
            )?;
            Some(date.and_hms_opt(0, 0, 0)?.and_utc().timestamp())
        })
        .unwrap_or(0)
}

/// `HH:MM:SS` / `MM:SS`, or a minute count such as `120分钟`, to seconds
pub fn parse_duration(text: &str) -> i64 {
    let text = text.trim();
    if text.contains(':') {
        return text
            .split(':')
            .map(|part| part.trim().parse::<i64>())
            .try_fold(0_i64, |acc, part| {
                acc.checked_mul(60)?.checked_add(part.ok()?)
            })
            .unwrap_or(0);
    }

    DIGITS
        .find(text)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .and_then(|minutes| minutes.checked_mul(60))
        .unwrap_or(0)
}

/// Builds an [`HtmlDecoder`] from per-field expressions
pub struct DecoderBuilder {
    fields: Vec<(Field, Result<Expr>)>,
    date_parser: fn(&str) -> i64,
    duration_parser: fn(&str) -> i64,
}

impl DecoderBuilder {
    #[must_use]
    pub fn field(mut self, field: Field, expr: &str) -> Self {
        self.fields.push((field, Expr::parse(expr)));
        self
    }

    #[must_use]
    pub fn labelled(mut self, field: Field, label_css: &str, label: &str, value: &str) -> Self {
        self.fields.push((field, Expr::labelled(label_css, label, value)));
        self
    }

    #[must_use]
    pub fn containing(mut self, field: Field, label_css: &str, label: &str) -> Self {
        self.fields.push((field, Expr::containing(label_css, label)));
        self
    }

    #[must_use]
    pub fn following(
        mut self,
        field: Field,
        label_css: &str,
        label: &str,
        value: Option<&str>,
    ) -> Self {
        self.fields.push((field, Expr::following(label_css, label, value)));
        self
    }

    #[must_use]
    pub fn date_parser(mut self, parser: fn(&str) -> i64) -> Self {
        self.date_parser = parser;
        self
    }

    #[must_use]
    pub fn duration_parser(mut self, parser: fn(&str) -> i64) -> Self {
        self.duration_parser = parser;
        self
    }

    /// Fails on the first expression that did not compile
    pub fn build(self) -> Result<HtmlDecoder> {
        let fields = self
            .fields
            .into_iter()
            .map(|(field, expr)| expr.map(|e| (field, e)))
            .collect::<Result<Vec<_>>>()?;

        Ok(HtmlDecoder {
            fields,
            date_parser: self.date_parser,
            duration_parser: self.duration_parser,
        })
    }
}

/// Expression-driven HTML to [`MetadataRecord`] decoder
pub struct HtmlDecoder {
    fields: Vec<(Field, Expr)>,
    date_parser: fn(&str) -> i64,
    duration_parser: fn(&str) -> i64,
}

impl HtmlDecoder {
    #[must_use]
    pub fn builder() -> DecoderBuilder {
        DecoderBuilder {
            fields: Vec::new(),
            date_parser: parse_date,
            duration_parser: parse_duration,
        }
    }

    fn all(&self, doc: &Html, field: Field) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(f, _)| *f == field)
            .flat_map(|(_, expr)| expr.values(doc))
            .collect()
    }

    fn first(&self, doc: &Html, field: Field) -> String {
        self.fields
            .iter()
            .filter(|(f, _)| *f == field)
            .find_map(|(_, expr)| expr.first(doc))
            .unwrap_or_default()
    }

    /// Decode a page. The cover doubles as the poster source when the page
    /// has none.
    #[must_use]
    pub fn decode(&self, body: &[u8]) -> MetadataRecord {
        let doc = Html::parse_document(&String::from_utf8_lossy(body));

        let cover = Some(self.first(&doc, Field::Cover)).filter(|c| !c.is_empty());
        let poster = Some(self.first(&doc, Field::Poster))
            .filter(|p| !p.is_empty())
            .or_else(|| cover.clone());

        MetadataRecord {
            number: self.first(&doc, Field::Number),
            title: self.first(&doc, Field::Title),
            plot: self.first(&doc, Field::Plot),
            actors: self.all(&doc, Field::Actors),
            release_date: (self.date_parser)(&self.first(&doc, Field::ReleaseDate)),
            duration: (self.duration_parser)(&self.first(&doc, Field::Duration)),
            studio: self.first(&doc, Field::Studio),
            label: self.first(&doc, Field::Label),
            series: self.first(&doc, Field::Series),
            director: self.first(&doc, Field::Director),
            genres: self.all(&doc, Field::Genres),
            cover: cover.map(ImageRef::new),
            poster: poster.map(ImageRef::new),
            sample_images: self
                .all(&doc, Field::SampleImages)
                .into_iter()
                .map(ImageRef::new)
                .collect(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <h2 class="title">ABP-123 Some Title</h2>
          <div class="info">
            <div class="row"><strong>Released:</strong><span class="v">2023-05-01</span></div>
            <div class="row"><strong>Length:</strong><span class="v">120 min</span></div>
            <div class="row"><strong>Cast:</strong><a class="v">Alice</a><a class="v">Bob</a></div>
          </div>
          <img class="cover" src="//img.example.com/cover.jpg">
          <a class="sample" href="/s/1.jpg"></a><a class="sample" href="/s/2.jpg"></a>
        </body></html>
    "#;

    #[test]
    fn test_decode_with_labels_and_attrs() {
        let decoder = HtmlDecoder::builder()
            .field(Field::Title, "h2.title")
            .labelled(Field::ReleaseDate, "div.row > strong", "Released", "span.v")
            .labelled(Field::Duration, "div.row > strong", "Length", "span.v")
            .labelled(Field::Actors, "div.row > strong", "Cast", "a.v")
            .field(Field::Cover, "img.cover@src")
            .field(Field::SampleImages, "a.sample@href")
            .build()
            .unwrap();

        let record = decoder.decode(PAGE.as_bytes());

        assert_eq!(record.title, "ABP-123 Some Title");
        assert_eq!(record.release_date, 1_682_899_200);
        assert_eq!(record.duration, 7200);
        assert_eq!(record.actors, vec!["Alice", "Bob"]);
        assert_eq!(record.cover.unwrap().name, "//img.example.com/cover.jpg");
        assert_eq!(record.poster.unwrap().name, "//img.example.com/cover.jpg");
        assert_eq!(record.sample_images.len(), 2);
        assert_eq!(record.sample_images[1].name, "/s/2.jpg");
    }

    #[test]
    fn test_following_label_siblings() {
        let page = r#"<div class="info">
            <b>品番</b>: abp-123<br>
            <b>出演者</b>: <a href="/star/1">Alice</a> <a href="/star/2">Bob</a><br>
            <b>メーカー</b>: <a href="/company/x">Studio X</a><br>
        </div>"#;
        let decoder = HtmlDecoder::builder()
            .following(Field::Number, "b", "品番", None)
            .following(Field::Actors, "b", "出演者", Some("a"))
            .following(Field::Studio, "b", "メーカー", Some("a"))
            .build()
            .unwrap();

        let record = decoder.decode(page.as_bytes());

        assert_eq!(record.number, "abp-123");
        assert_eq!(record.actors, vec!["Alice", "Bob"]);
        assert_eq!(record.studio, "Studio X");
        assert!(record.cover.is_none());
        assert!(record.poster.is_none());
    }

    #[test]
    fn test_containing_reads_label_element() {
        let page = r#"<div class="intro">
            <p>发行商: X</p>
            <p>简介：A short plot</p>
        </div>"#;
        let decoder = HtmlDecoder::builder()
            .containing(Field::Plot, "div.intro p", "简介")
            .build()
            .unwrap();

        assert_eq!(decoder.decode(page.as_bytes()).plot, "简介：A short plot");
    }

    #[test]
    fn test_invalid_selector_fails_build() {
        let result = HtmlDecoder::builder().field(Field::Title, "h2[").build();
        assert!(matches!(result, Err(ScraperError::Config(_))));
    }

    #[test]
    fn test_parse_date_and_duration() {
        assert_eq!(parse_date("发行日期: 2023/05/01"), 1_682_899_200);
        assert_eq!(parse_date("2023年5月1日"), 1_682_899_200);
        assert_eq!(parse_date("unknown"), 0);

        assert_eq!(parse_duration("02:00:00"), 7200);
        assert_eq!(parse_duration("90:30"), 5430);
        assert_eq!(parse_duration("120分钟"), 7200);
        assert_eq!(parse_duration(""), 0);
    }

    #[test]
    fn test_parse_duration_overflow_is_zero() {
        assert_eq!(parse_duration("9223372036854775807:59"), 0);
        assert_eq!(parse_duration("153722867280912931分钟"), 0);
        assert_eq!(parse_duration("99999999999999999999分钟"), 0);
    }
}
