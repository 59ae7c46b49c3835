// Breadth-first crawler for csrf-audit
//
// Depth-limited and restricted to the seed's origin. Each level is fetched on a
// bounded pool of `concurrency` in-flight requests; the level's results are
// collected by the crawl loop itself before any of them is read.

use crate::engine::Transport;
use crate::models::{FormInput, FormRecord, Method, Page};
use crate::parsers::forms::{classify_input, parse_forms};
use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};
use url::Url;

lazy_static! {
    static ref LINK: Selector = Selector::parse("a[href]").unwrap();
}

#[derive(Debug, Clone)]
pub struct CrawlResults {
    /// Pages in discovery order. A URL with a query string yields an extra
    /// synthetic GET form built from its parameters.
    pub pages: Vec<Page>,
    pub urls_visited: usize,
}

impl CrawlResults {
    pub fn form_count(&self) -> usize {
        self.pages.iter().map(|p| p.forms.len()).sum()
    }
}

pub struct Crawler<'a, T: Transport> {
    transport: &'a T,
    headers: &'a BTreeMap<String, String>,
    depth: usize,
    concurrency: usize,
}

impl<'a, T: Transport> Crawler<'a, T> {
    pub fn new(
        transport: &'a T,
        headers: &'a BTreeMap<String, String>,
        depth: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            transport,
            headers,
            depth,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn crawl(&self, seed_url: &str) -> Result<CrawlResults> {
        let seed = Url::parse(seed_url).with_context(|| format!("invalid target URL {}", seed_url))?;
        info!("[Crawler] Starting crawl of {} (depth {})", seed, self.depth);

        let start = strip_fragment(&seed);
        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(start.clone());
        let mut frontier = vec![start];
        let mut visited = 0;
        let mut pages = Vec::new();

        for level in 0..self.depth {
            if frontier.is_empty() {
                break;
            }
            debug!("[Crawler] Level {}: {} URL(s)", level, frontier.len());
            visited += frontier.len();

            let seed_ref = &seed;
            let fetched: Vec<(Vec<Page>, Vec<String>)> = stream::iter(std::mem::take(&mut frontier))
                .map(|url| async move { self.visit(&url, seed_ref).await })
                .buffered(self.concurrency)
                .collect()
                .await;

            // next level keeps the order links were found in
            for (found, links) in fetched {
                pages.extend(found);
                for link in links {
                    if seen.insert(link.clone()) {
                        frontier.push(link);
                    }
                }
            }
        }

        info!(
            "[Crawler] Crawl complete: {} URL(s), {} form(s)",
            visited,
            pages.iter().map(|p| p.forms.len()).sum::<usize>()
        );
        Ok(CrawlResults {
            pages,
            urls_visited: visited,
        })
    }

    async fn visit(&self, raw_url: &str, seed: &Url) -> (Vec<Page>, Vec<String>) {
        let mut pages = Vec::new();
        let Ok(url) = Url::parse(raw_url) else {
            return (pages, Vec::new());
        };

        let params: BTreeMap<String, String> = url.query_pairs().into_owned().collect();
        let mut bare = url.clone();
        bare.set_query(None);
        let bare = bare.to_string();

        if !params.is_empty() {
            let inputs = params
                .iter()
                .map(|(name, value)| FormInput::new(name, classify_input("text", value), value))
                .collect();
            pages.push(Page {
                url: bare.clone(),
                forms: vec![FormRecord::new(bare.clone(), Method::GET, inputs)],
            });
        }

        let body = match self
            .transport
            .request(&bare, &params, self.headers, true, 0)
            .await
        {
            Ok(resp) => resp.body,
            Err(e) => {
                warn!("[Crawler] Failed to fetch {}: {}", raw_url, e);
                return (pages, Vec::new());
            }
        };

        pages.push(Page {
            url: bare.clone(),
            forms: parse_forms(&bare, &body),
        });
        let links = extract_links(&url, seed, &body);
        (pages, links)
    }
}

/// In-scope absolute links on a page, fragments removed
pub fn extract_links(page: &Url, seed: &Url, html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page.join(href.trim()).ok())
        .filter(|u| matches!(u.scheme(), "http" | "https"))
        .filter(|u| u.origin() == seed.origin())
        .map(|u| strip_fragment(&u))
        .collect()
}

fn strip_fragment(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    url.to_string()
}
