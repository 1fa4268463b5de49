//! Source-site page fetching and HTML extraction
//!
//! The [`SourceParser`] trait is the seam between the orchestrators and the
//! source site; [`XbanxiaParser`] is the production implementation. The HTML
//! extraction itself is pure (string in, records out), so it is testable
//! without a network.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{Error, Result};
use crate::types::{ChapterRef, NovelMetadata, Pagination};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Boilerplate line the source site appends to chapter bodies
const FOOTER_MARKER: &str = "本站無彈出廣告";

/// A parsed novel page: metadata plus the ordered chapter list
#[derive(Clone, Debug, PartialEq)]
pub struct NovelPage {
    /// Scraped novel metadata
    pub metadata: NovelMetadata,
    /// Chapters in listed order, numbered from 1
    pub chapters: Vec<ChapterRef>,
}

/// A parsed collection listing page
#[derive(Clone, Debug, PartialEq)]
pub struct CollectionPage {
    /// Absolute novel page URLs in listed order
    pub novel_urls: Vec<String>,
    /// Pagination state of this listing page
    pub pagination: Pagination,
}

/// A parsed chapter page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChapterPage {
    /// Chapter title from the page heading
    pub title: String,
    /// Plain-text content, paragraphs separated by blank lines
    pub content: String,
}

/// Fetches and parses source-site pages
#[async_trait]
pub trait SourceParser: Send + Sync {
    /// Fetch and parse a novel page
    async fn fetch_novel_page(&self, url: &str) -> Result<NovelPage>;

    /// Fetch and parse a collection listing page
    async fn fetch_collection_page(&self, url: &str) -> Result<CollectionPage>;

    /// Fetch and parse a chapter page
    ///
    /// Returns `Ok(None)` when the page loads but carries no content block.
    /// Such chapters are skipped, not treated as failures.
    async fn fetch_chapter_page(&self, url: &str) -> Result<Option<ChapterPage>>;
}

/// Parser for the xbanxia source site
pub struct XbanxiaParser {
    client: reqwest::Client,
}

impl XbanxiaParser {
    /// Create a parser with its own HTTP client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[async_trait]
impl SourceParser for XbanxiaParser {
    async fn fetch_novel_page(&self, url: &str) -> Result<NovelPage> {
        let html = self.fetch_html(url).await?;
        parse_novel_html(url, &html)
    }

    async fn fetch_collection_page(&self, url: &str) -> Result<CollectionPage> {
        let html = self.fetch_html(url).await?;
        parse_collection_html(url, &html)
    }

    async fn fetch_chapter_page(&self, url: &str) -> Result<Option<ChapterPage>> {
        let html = self.fetch_html(url).await?;
        Ok(parse_chapter_html(&html))
    }
}

fn selector(css: &str) -> Selector {
    // Selectors are compile-time constants; a typo is a programming error
    #[allow(clippy::expect_used)]
    Selector::parse(css).expect("invalid selector")
}

fn join_url(base: &str, href: &str) -> Result<String> {
    let base = Url::parse(base).map_err(|e| Error::Parse(format!("bad base URL {base}: {e}")))?;
    let joined = base
        .join(href)
        .map_err(|e| Error::Parse(format!("bad link {href}: {e}")))?;
    Ok(joined.to_string())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Extract metadata and the chapter list from a novel page
pub fn parse_novel_html(url: &str, html: &str) -> Result<NovelPage> {
    let document = Html::parse_document(html);

    let intro_sel = selector("div.book-intro");
    let intro = document
        .select(&intro_sel)
        .next()
        .ok_or_else(|| Error::Parse(format!("no book intro section at {url}")))?;

    let title = intro
        .select(&selector("h1"))
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Parse(format!("no novel title at {url}")))?;

    let cover_url = intro.select(&selector("img.lazy")).next().and_then(|img| {
        img.value()
            .attr("data-original")
            .or_else(|| img.value().attr("src"))
            .map(|href| join_url(url, href))
            .transpose()
            .ok()
            .flatten()
    });

    let mut author = String::new();
    let mut kind = String::new();
    let mut status = String::new();
    let mut description = String::new();

    if let Some(describe) = intro.select(&selector("div.book-describe")).next() {
        for p in describe.select(&selector("p")) {
            let text = element_text(p);
            if text.starts_with("作者") {
                if let Some(link) = p.select(&selector("a")).next() {
                    author = element_text(link);
                }
            } else if text.starts_with("類型") {
                kind = text.trim_start_matches("類型︰").trim().to_string();
            } else if text.starts_with("狀態") {
                status = text.trim_start_matches("狀態︰").trim().to_string();
            }
        }

        if let Some(desc) = describe.select(&selector("div.describe-html")).next() {
            description = desc.inner_html().trim().to_string();
        }
    }

    let mut chapters = Vec::new();
    if let Some(list) = document.select(&selector("div.book-list")).next() {
        for link in list.select(&selector("a")) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let chapter_url = join_url(url, href)?;
            if !chapter_url.contains("/books/") || chapter_url == url {
                continue;
            }
            let title = link
                .value()
                .attr("title")
                .map(str::to_string)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| element_text(link));
            chapters.push(ChapterRef {
                number: chapters.len() as u32 + 1,
                title,
                source_url: chapter_url,
            });
        }
    }

    Ok(NovelPage {
        metadata: NovelMetadata {
            title,
            author,
            description,
            cover_url,
            kind,
            status,
        },
        chapters,
    })
}

/// Extract novel links and pagination from a collection listing page
pub fn parse_collection_html(url: &str, html: &str) -> Result<CollectionPage> {
    let document = Html::parse_document(html);

    let mut novel_urls = Vec::new();
    if let Some(books) = document.select(&selector("div.pop-books2")).next() {
        for item in books.select(&selector("li.pop-book2")) {
            let Some(link) = item.select(&selector("a[href]")).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if href.contains("/books/") {
                novel_urls.push(join_url(url, href)?);
            }
        }
    }

    let mut pagination = Pagination {
        current: 1,
        total: 1,
        next_url: None,
    };
    if let Some(pagelink) = document.select(&selector("div.pagelink")).next() {
        if let Some(stats) = pagelink.select(&selector("em#pagestats")).next() {
            let text = element_text(stats);
            if let Some((current, total)) = text.split_once('/')
                && let (Ok(current), Ok(total)) =
                    (current.trim().parse::<u32>(), total.trim().parse::<u32>())
            {
                pagination.current = current;
                pagination.total = total;
            }
        }
        if let Some(next) = pagelink.select(&selector("a.next")).next()
            && let Some(href) = next.value().attr("href")
        {
            pagination.next_url = Some(join_url(url, href)?);
        }
    }

    Ok(CollectionPage {
        novel_urls,
        pagination,
    })
}

/// Extract the title and cleaned text content from a chapter page
///
/// Returns `None` when the content block is absent.
pub fn parse_chapter_html(html: &str) -> Option<ChapterPage> {
    let document = Html::parse_document(html);

    let content_el = document.select(&selector("div#nr1")).next()?;

    let title = document
        .select(&selector("h1#nr_title"))
        .next()
        .map(element_text)
        .unwrap_or_default();

    let mut raw = String::new();
    collect_content_text(content_el, &mut raw);

    let content = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(FOOTER_MARKER))
        .collect::<Vec<_>>()
        .join("\n\n");

    Some(ChapterPage { title, content })
}

// Text extraction that skips script/style subtrees and turns br/p/div
// boundaries into line breaks.
fn collect_content_text(el: ElementRef<'_>, out: &mut String) {
    let name = el.value().name();
    if matches!(name, "script" | "style") {
        return;
    }
    if name == "br" {
        out.push('\n');
        return;
    }
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
        } else if let Some(child_el) = ElementRef::wrap(child) {
            collect_content_text(child_el, out);
        }
    }
    if matches!(name, "p" | "div") {
        out.push('\n');
    }
}
