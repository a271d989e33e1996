use crate::types::{AggregatorError, FetchConfig, Result, Source};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// Built-in country feeds, in catalog order.
pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("United States", "https://www.cisa.gov/cybersecurity-advisories/alerts.xml"),
    ("Canada", "https://www.cyber.gc.ca/api/cccs/rss/v1/get?feed=alerts_advisories&lang=fr"),
    ("Germany", "https://www.heise.de/security/feed.xml"),
    ("United Kingdom", "https://www.theregister.co.uk/security/headlines.rss"),
    ("Italy", "https://www.cybersecurity360.it/feed/"),
    ("Spain", "https://www.computerworld.es/feed/"),
    ("France", "https://www.cert.ssi.gouv.fr/feed/"),
    ("Japan", "https://rss.itmedia.co.jp/rss/2.0/itmedia_all.xml"),
    ("Russia", "https://habr.com/ru/rss/all/"),
    ("South Korea", "https://zdnet.co.kr/feed"),
    ("India", "https://cyberops.in/blog/feed/"),
    ("Thailand", "https://www.thaicert.or.th/sitemap.rss"),
    ("Vietnam", "https://www.vncert.gov.vn/feed/"),
    ("China", "https://www.csa.gov.sg/Content/RSS-Feed"),
    ("Malaysia", "https://www.mycert.org.my/feed/"),
    ("Egypt", "https://egcert.eg/feed/"),
    ("Saudi Arabia", "https://www.nca.gov.sa/feed/"),
    ("Iran", "https://cert.ir/feed/"),
    ("Brazil", "https://www.cert.br/rss/certbr-rss.xml"),
    ("Morocco", "https://www.marocert.ma/feed/"),
    ("Algeria", "https://www.cerist.dz/index.php/en/?format=feed&type=rss"),
    ("Australia", "\thttps://auscert.org.au/rss/bulletins/"),
];

/// Ordered set of feed sources with unique ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceCatalog {
    sources: Vec<Source>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builtin() -> Result<Self> {
        let mut catalog = Self::new();
        for (id, url) in DEFAULT_FEEDS {
            catalog.add(*id, *url)?;
        }
        Ok(catalog)
    }

    /// Add a source. The URL is trimmed and must be absolute http(s).
    pub fn add(&mut self, id: impl Into<String>, url: impl AsRef<str>) -> Result<()> {
        let id = id.into();
        let url = url.as_ref().trim();

        if id.trim().is_empty() {
            return Err(AggregatorError::Config("source id must not be empty".to_string()));
        }
        if self.sources.iter().any(|s| s.id == id) {
            return Err(AggregatorError::Config(format!("duplicate source id: {}", id)));
        }

        let parsed = Url::parse(url)?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host().is_none() {
            return Err(AggregatorError::Config(format!("{}: not an http(s) feed URL: {}", id, url)));
        }

        self.sources.push(Source {
            id,
            url: url.to_string(),
        });
        Ok(())
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// On-disk override: `{ "sources": { "<id>": "<url>" }, "proxies": [ ... ] }`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SourcesFile {
    #[serde(default)]
    sources: Option<BTreeMap<String, String>>,
    #[serde(default)]
    proxies: Option<Vec<String>>,
}

/// Everything a run needs besides the output location.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub catalog: SourceCatalog,
    pub fetch: FetchConfig,
}

impl AppConfig {
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            catalog: SourceCatalog::builtin()?,
            fetch: FetchConfig::default(),
        })
    }

    /// Apply a sources file on top of the current configuration.
    ///
    /// `sources` replaces the whole catalog when present; `proxies` replaces
    /// the proxy list when present. Absent keys keep what is already there.
    pub fn apply_sources_json(&mut self, content: &str) -> Result<()> {
        let file: SourcesFile = serde_json::from_str(content)
            .map_err(|e| AggregatorError::Config(format!("invalid sources file: {}", e)))?;

        if let Some(sources) = file.sources {
            let mut catalog = SourceCatalog::new();
            for (id, url) in sources {
                catalog.add(id, url)?;
            }
            if catalog.is_empty() {
                return Err(AggregatorError::Config("sources file lists no sources".to_string()));
            }
            debug!("Sources file replaces catalog with {} sources", catalog.len());
            self.catalog = catalog;
        }

        if let Some(proxies) = file.proxies {
            let proxies: Vec<String> = proxies
                .into_iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            debug!("Sources file sets {} proxies", proxies.len());
            self.fetch.proxies = proxies;
        }

        Ok(())
    }

    pub fn load_sources_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AggregatorError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        self.apply_sources_json(&content)?;
        info!("Loaded sources file {}", path.display());
        Ok(())
    }
}
