use super::decoder::Expr;
use super::http::{HttpRequest, HttpResponse};
use super::traits::Invoker;
use crate::scraper::types::{Identity, clean_id};
use crate::scraper::{Result, ScraperError};
use reqwest::{StatusCode, Url};
use scraper::Html;
use std::collections::BTreeSet;
use tracing::debug;

/// How a listing title is compared with the target code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    /// Title equals the code once `-`/`_` are removed, ignoring case
    CleanIdEquals,
    /// Title contains the code, ignoring case and separators
    Contains,
    /// Title contains the code as written, ignoring case only
    ContainsCode,
}

impl TitleMatch {
    fn is_match(self, title: &str, identity: &Identity) -> bool {
        let title = title.trim();
        match self {
            Self::CleanIdEquals => clean_id(title).to_uppercase() == identity.clean_id(),
            Self::Contains => clean_id(title)
                .to_uppercase()
                .contains(&identity.clean_id()),
            Self::ContainsCode => title
                .to_uppercase()
                .contains(&identity.code().to_uppercase()),
        }
    }
}

/// Search-page lookup followed by a detail-page fetch
#[derive(Debug, Clone)]
pub struct TwoStep {
    links: Expr,
    titles: Expr,
    matcher: TitleMatch,
    valid_status: Vec<StatusCode>,
}

impl TwoStep {
    /// `links` and `titles` must yield parallel lists on the listing page
    pub fn new(links: &str, titles: &str, matcher: TitleMatch) -> Result<Self> {
        Ok(Self {
            links: Expr::parse(links)?,
            titles: Expr::parse(titles)?,
            matcher,
            valid_status: vec![StatusCode::OK],
        })
    }

    #[must_use]
    pub fn with_valid_status(mut self, valid_status: Vec<StatusCode>) -> Self {
        self.valid_status = valid_status;
        self
    }

    /// Pick the single detail link matching the identity
    pub fn select_link(&self, body: &[u8], identity: &Identity) -> Result<String> {
        let doc = Html::parse_document(&String::from_utf8_lossy(body));
        let links = self.links.values(&doc);
        let titles = self.titles.values(&doc);

        if links.len() != titles.len() {
            return Err(ScraperError::NotFound(format!(
                "listing has {} links but {} titles",
                links.len(),
                titles.len()
            )));
        }

        let matched: BTreeSet<&str> = links
            .iter()
            .zip(&titles)
            .filter(|(_, title)| self.matcher.is_match(title, identity))
            .map(|(link, _)| link.as_str())
            .collect();

        let mut matched = matched.into_iter();
        match (matched.next(), matched.next()) {
            (Some(link), None) => Ok(link.to_string()),
            (None, _) => Err(ScraperError::NotFound(format!(
                "no listing entry for {}",
                identity.code()
            ))),
            (Some(_), Some(_)) => Err(ScraperError::NotFound(format!(
                "ambiguous listing entries for {}",
                identity.code()
            ))),
        }
    }

    pub async fn retrieve(
        &self,
        invoker: &Invoker<'_>,
        request: HttpRequest,
        identity: &Identity,
    ) -> Result<HttpResponse> {
        let listing_url = request.url.clone();
        let listing = invoker.invoke(request).await?;
        if !self.valid_status.contains(&listing.status) {
            return Err(ScraperError::Api {
                status: listing.status.as_u16(),
                message: format!("unexpected status for listing {listing_url}"),
            });
        }

        let link = self.select_link(&listing.body, identity)?;
        let detail = resolve_url(&listing_url, &link)?;
        debug!(code = identity.code(), %detail, "listing matched");

        invoker.invoke(HttpRequest::get(detail.as_str())?).await
    }
}

/// Resolve a relative or protocol-relative link against a base URL
pub fn resolve_url(base: &Url, link: &str) -> Result<Url> {
    base.join(link)
        .map_err(|e| ScraperError::Parse(format!("invalid link `{link}`: {e}")))
}
