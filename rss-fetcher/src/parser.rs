use crate::rss_utils::{date, text};
use crate::types::{FeedFormat, FeedItem, NormalizedRecord, ParseError};
use crate::xml::{self, Element};
use chrono::Utc;
use tracing::{debug, error, info, trace, warn};

pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const DUBLIN_CORE_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const RSS1_NS: &str = "http://purl.org/rss/1.0/";

/// Element name as the parser looks it up.
#[derive(Debug, Clone, Copy)]
pub enum Tag {
    /// Unqualified, or in the RSS 1.0 namespace.
    Rss(&'static str),
    Atom(&'static str),
    DublinCore(&'static str),
}

impl Tag {
    pub fn matches(&self, element: &Element) -> bool {
        match *self {
            Tag::Rss(name) => element.is(None, name) || element.is(Some(RSS1_NS), name),
            Tag::Atom(name) => element.is(Some(ATOM_NS), name),
            Tag::DublinCore(name) => element.is(Some(DUBLIN_CORE_NS), name),
        }
    }
}

fn child<'a>(item: &'a Element, tag: Tag) -> Option<&'a Element> {
    item.children.iter().find(|c| tag.matches(c))
}

fn child_text(item: &Element, tag: Tag) -> Option<String> {
    child(item, tag).and_then(|c| c.trimmed_text()).map(str::to_string)
}

type Extractor = fn(&Element) -> Option<String>;

/// Ordered extraction strategies for one logical field.
///
/// The first extractor returning a non-empty value wins.
pub struct FieldChain {
    pub field: &'static str,
    pub extractors: &'static [(&'static str, Extractor)],
}

impl FieldChain {
    pub fn extract(&self, item: &Element) -> Option<String> {
        self.extract_with_source(item).map(|(_, value)| value)
    }

    /// Like [`FieldChain::extract`], also naming the extractor that matched.
    pub fn extract_with_source(&self, item: &Element) -> Option<(&'static str, String)> {
        self.extractors.iter().find_map(|(name, extractor)| {
            extractor(item)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (*name, v))
        })
    }
}

fn inline_content(item: &Element) -> Option<&Element> {
    child(item, Tag::Rss("content")).or_else(|| child(item, Tag::Atom("content")))
}

fn atom_title(item: &Element) -> Option<String> {
    child_text(item, Tag::Atom("title"))
}

fn rss_title(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("title"))
}

fn atom_alternate_link(item: &Element) -> Option<String> {
    item.descendants()
        .into_iter()
        .find(|e| Tag::Atom("link").matches(e) && e.attr("rel") == Some("alternate"))
        .and_then(|e| e.attr("href"))
        .map(str::to_string)
}

fn rss_link(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("link"))
}

fn atom_link(item: &Element) -> Option<String> {
    item.children_where(|c| Tag::Atom("link").matches(c))
        .find_map(|e| e.attr("href"))
        .map(str::to_string)
}

fn rss_guid(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("guid"))
}

fn content_href(item: &Element) -> Option<String> {
    inline_content(item).and_then(|c| text::extract_href(&c.text))
}

fn atom_summary(item: &Element) -> Option<String> {
    child_text(item, Tag::Atom("summary"))
}

fn rss_description(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("description"))
}

fn content_text(item: &Element) -> Option<String> {
    inline_content(item).and_then(|c| c.trimmed_text()).map(str::to_string)
}

fn atom_updated(item: &Element) -> Option<String> {
    child_text(item, Tag::Atom("updated"))
}

fn atom_published(item: &Element) -> Option<String> {
    child_text(item, Tag::Atom("published"))
}

fn rss_pub_date(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("pubDate"))
}

fn rss_published(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("published"))
}

fn rss_updated(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("updated"))
}

fn rss_date(item: &Element) -> Option<String> {
    child_text(item, Tag::Rss("date"))
}

fn dc_date(item: &Element) -> Option<String> {
    child_text(item, Tag::DublinCore("date"))
}

pub static TITLE_CHAIN: FieldChain = FieldChain {
    field: "title",
    extractors: &[("atom:title", atom_title), ("title", rss_title)],
};

pub static LINK_CHAIN: FieldChain = FieldChain {
    field: "link",
    extractors: &[
        ("atom:link[rel=alternate]", atom_alternate_link),
        ("link", rss_link),
        ("atom:link", atom_link),
        ("guid", rss_guid),
        ("content[href]", content_href),
    ],
};

pub static DESCRIPTION_CHAIN: FieldChain = FieldChain {
    field: "description",
    extractors: &[
        ("atom:summary", atom_summary),
        ("description", rss_description),
        ("content", content_text),
    ],
};

pub static DATE_CHAIN: FieldChain = FieldChain {
    field: "date",
    extractors: &[
        ("atom:updated", atom_updated),
        ("atom:published", atom_published),
        ("pubDate", rss_pub_date),
        ("published", rss_published),
        ("updated", rss_updated),
        ("date", rss_date),
        ("dc:date", dc_date),
    ],
};

pub fn detect_format(root: &Element) -> FeedFormat {
    if root.name.ends_with("rss") {
        FeedFormat::Rss
    } else if root.name.ends_with("feed") {
        FeedFormat::Atom
    } else {
        FeedFormat::Unknown
    }
}

fn rss_items(root: &Element) -> Vec<&Element> {
    root.descendants()
        .into_iter()
        .filter(|e| Tag::Rss("item").matches(e))
        .collect()
}

fn atom_entries(root: &Element) -> Vec<&Element> {
    root.descendants()
        .into_iter()
        .filter(|e| Tag::Atom("entry").matches(e))
        .collect()
}

pub fn discover_items(root: &Element, format: FeedFormat) -> Vec<&Element> {
    match format {
        FeedFormat::Rss => rss_items(root),
        FeedFormat::Atom => atom_entries(root),
        FeedFormat::Unknown => {
            let items = rss_items(root);
            if items.is_empty() {
                atom_entries(root)
            } else {
                items
            }
        }
    }
}

fn extract_field(chain: &FieldChain, element: &Element, position: usize) -> Option<String> {
    let (source, value) = chain.extract_with_source(element)?;
    trace!("item #{}: {} from <{}>", position, chain.field, source);
    Some(value)
}

fn to_feed_item(element: &Element, position: usize) -> FeedItem {
    FeedItem {
        title: extract_field(&TITLE_CHAIN, element, position),
        link: extract_field(&LINK_CHAIN, element, position),
        description: extract_field(&DESCRIPTION_CHAIN, element, position),
        raw_date: extract_field(&DATE_CHAIN, element, position),
        position,
    }
}

/// Dated candidates, newest first; equal timestamps keep document order.
pub fn rank_items(items: Vec<FeedItem>) -> Vec<(date::NormalizedDate, FeedItem)> {
    let mut dated: Vec<(date::NormalizedDate, FeedItem)> = items
        .into_iter()
        .filter_map(|item| {
            let normalized = date::normalize(item.raw_date.as_deref()?);
            Some((normalized, item))
        })
        .collect();
    // sort_by is stable
    dated.sort_by(|(a, _), (b, _)| b.timestamp.cmp(&a.timestamp));
    dated
}

pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Select the newest item of a feed and normalize its fields.
    pub fn parse(&self, content: &str, source_id: &str, feed_url: &str) -> Result<NormalizedRecord, ParseError> {
        let content = content.trim();
        if content.is_empty() {
            warn!("Empty content for {}", source_id);
            return Err(ParseError::EmptyContent);
        }

        let root = match xml::parse_document(content) {
            Ok(root) => root,
            Err(e) => {
                error!("XML parse error for {}: {}", source_id, e);
                return Err(e);
            }
        };

        let format = detect_format(&root);
        let elements = discover_items(&root, format);
        debug!("{}: {:?} document with {} candidate items ({})", source_id, format, elements.len(), feed_url);
        if elements.is_empty() {
            warn!("No items found for {}", source_id);
            return Err(ParseError::EmptyFeed);
        }

        let items = elements
            .into_iter()
            .enumerate()
            .map(|(position, element)| to_feed_item(element, position))
            .collect();

        let (normalized, latest) = match rank_items(items).into_iter().next() {
            Some(ranked) => ranked,
            None => {
                warn!("No dated items for {}", source_id);
                return Err(ParseError::EmptyFeed);
            }
        };
        debug!("{}: selected item #{} dated {:?}", source_id, latest.position, latest.raw_date);

        let title = latest.title.as_deref().map(text::clean).filter(|t| !t.is_empty());
        let description = latest.description.as_deref().map(text::clean).filter(|d| !d.is_empty());

        let record = NormalizedRecord {
            title,
            link: latest.link,
            description,
            pub_date: latest.raw_date.unwrap_or_default(),
            last_fetched: Utc::now(),
            date_fallback: normalized.fallback,
            score: None,
        };

        if !record.is_valid() {
            warn!("No valid item for {}", source_id);
            return Err(ParseError::NoValidItem);
        }

        info!("Parsed latest item for {}: {:?}", source_id, record.title);
        Ok(record)
    }
}

impl Default for FeedParser {
    fn default() -> Self {
        Self::new()
    }
}
