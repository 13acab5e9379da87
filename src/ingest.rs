use std::path::Path;

use log::{debug, error, info};

use crate::fetch::Fetch;
use crate::location::{Locate, label_for};
use crate::parser::{Candidate, SourceFormat};
use crate::proxy::registry::{Registry, Upsert};

/// Drains source lists one after another into a single registry.
pub struct Ingestor<'a> {
    fetcher: &'a dyn Fetch,
    locator: &'a dyn Locate,
    registry: Registry,
}

impl<'a> Ingestor<'a> {
    pub fn new(fetcher: &'a dyn Fetch, locator: &'a dyn Locate) -> Self {
        Self {
            fetcher,
            locator,
            registry: Registry::new(),
        }
    }

    /// Processes every URL listed in `list`. An unreadable list contributes nothing.
    pub async fn ingest_list(&mut self, list: &Path, format: SourceFormat) {
        let content = match tokio::fs::read_to_string(list).await {
            Ok(content) => content,
            Err(e) => {
                error!("[Ingest] cannot read {}: {}", list.display(), e);
                return;
            }
        };

        let before = self.registry.len();
        for (index, url) in content.lines().enumerate() {
            let url = url.trim();
            if url.is_empty() {
                continue;
            }
            self.ingest_source(url, index, format).await;
        }
        info!(
            "[Ingest] {} ({}): {} new proxies, {} total",
            list.display(),
            format,
            self.registry.len() - before,
            self.registry.len()
        );
    }

    /// Fetches and parses one source; failures stay local to it.
    pub async fn ingest_source(&mut self, url: &str, index: usize, format: SourceFormat) {
        let document = match self.fetcher.fetch(url).await {
            Ok(document) => document,
            Err(e) => {
                error!("[Ingest] fetching {} failed: {}", url, e);
                return;
            }
        };

        let entries = match format.parse(&document) {
            Ok(entries) => entries,
            Err(e) => {
                error!("[Ingest] {} source {} ({}) failed: {}", format, index, url, e);
                return;
            }
        };

        for (i, entry) in entries.into_iter().enumerate() {
            let position = i + format.first_position();
            match entry {
                Ok(candidate) => self.admit(candidate, index, position).await,
                Err(e) => error!("[Ingest] {} source {} entry {}: {}", format, index, position, e),
            }
        }
    }

    async fn admit(&mut self, mut candidate: Candidate, index: usize, position: usize) {
        if !self.registry.contains(&candidate.key) {
            let location = label_for(self.locator, candidate.proxy.server()).await;
            let name = format!(
                "{}-{} | {}-{}",
                location,
                candidate.proxy.type_name(),
                index,
                position
            );
            candidate.proxy.set_name(name);
        }
        if self.registry.upsert(candidate.key, candidate.proxy) == Upsert::Inserted {
            debug!("[Ingest] added proxy #{}", self.registry.len());
        }
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }
}
