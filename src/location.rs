use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use log::{debug, warn};
use maxminddb::Reader;
use serde::Deserialize;
use thiserror::Error;

pub const UNKNOWN_LABEL: &str = "🏳 Unknown";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LocateError {
    #[error("DNS lookup for {host} failed: {reason}")]
    Dns { host: String, reason: String },

    #[error("GeoIP database unavailable: {0}")]
    Database(String),

    #[error("no country recorded for {0}")]
    NotFound(String),

    #[error("invalid country code: {0}")]
    InvalidCountryCode(String),
}

#[async_trait]
pub trait Locate: Send + Sync {
    /// ISO 3166-1 alpha-2 country code of the host serving `host`.
    async fn locate(&self, host: &str) -> Result<String, LocateError>;
}

/// Display label for `host`: flag glyph plus country code, or [`UNKNOWN_LABEL`].
pub async fn label_for(locator: &dyn Locate, host: &str) -> String {
    match locator.locate(host).await.and_then(|code| label(&code)) {
        Ok(label) => label,
        Err(e) => {
            debug!("[GeoIP] {}: {}", host, e);
            UNKNOWN_LABEL.to_string()
        }
    }
}

fn label(code: &str) -> Result<String, LocateError> {
    // 台湾使用中国旗帜，代码保持不变
    let flag = if code == "TW" {
        flag_emoji("CN")?
    } else {
        flag_emoji(code)?
    };
    Ok(format!("{} {}", flag, code))
}

/// Maps a two-letter country code onto its regional indicator pair.
pub fn flag_emoji(code: &str) -> Result<String, LocateError> {
    if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(LocateError::InvalidCountryCode(code.to_string()));
    }
    code.to_ascii_uppercase()
        .chars()
        .map(|c| char::from_u32(0x1F1E6 + (c as u32 - 'A' as u32)))
        .collect::<Option<String>>()
        .ok_or_else(|| LocateError::InvalidCountryCode(code.to_string()))
}

#[derive(Deserialize, Debug)]
struct CountryRecord {
    country: Option<CountryInfo>,
}

#[derive(Deserialize, Debug)]
struct CountryInfo {
    iso_code: Option<String>,
}

/// MaxMind-backed locator. The database is opened once; an open failure is remembered and
/// reported on every lookup.
pub struct GeoLocator {
    reader: Result<Reader<Vec<u8>>, String>,
    cache: Mutex<HashMap<String, String>>,
}

impl GeoLocator {
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let reader = Reader::open_readfile(path).map_err(|e| {
            warn!("[GeoIP] cannot open {}: {}", path.display(), e);
            e.to_string()
        });
        Self {
            reader,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn country_of(&self, ip: IpAddr) -> Result<String, LocateError> {
        let reader = self
            .reader
            .as_ref()
            .map_err(|e| LocateError::Database(e.clone()))?;
        let record: CountryRecord = reader
            .lookup(ip)
            .map_err(|_| LocateError::NotFound(ip.to_string()))?;
        record
            .country
            .and_then(|c| c.iso_code)
            .ok_or_else(|| LocateError::NotFound(ip.to_string()))
    }
}

#[async_trait]
impl Locate for GeoLocator {
    async fn locate(&self, host: &str) -> Result<String, LocateError> {
        if let Some(code) = self.cache.lock().ok().and_then(|c| c.get(host).cloned()) {
            return Ok(code);
        }

        let ip = resolve(host).await?;
        let code = self.country_of(ip)?;

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(host.to_string(), code.clone());
        }
        Ok(code)
    }
}

/// Literal addresses are used as-is; names are resolved, IPv4 answers preferred.
async fn resolve(host: &str) -> Result<IpAddr, LocateError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }
    let name = host.split(':').next().unwrap_or(host);
    if let Ok(ip) = name.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<IpAddr> = tokio::net::lookup_host((name, 0))
        .await
        .map_err(|e| LocateError::Dns {
            host: name.to_string(),
            reason: e.to_string(),
        })?
        .map(|addr| addr.ip())
        .collect();

    addrs
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| LocateError::Dns {
            host: name.to_string(),
            reason: "no addresses".to_string(),
        })
}


#[cfg(test)]
mod tests {
    use super::testing::StaticLocator;
    use super::*;

    #[test]
    fn flag_for_us() {
        assert_eq!(flag_emoji("US").unwrap(), "🇺🇸");
        assert_eq!(label("US").unwrap(), "🇺🇸 US");
    }

    #[test]
    fn taiwan_uses_china_flag() {
        assert_eq!(label("TW").unwrap(), "🇨🇳 TW");
    }

    #[test]
    fn bad_codes_are_rejected() {
        assert!(flag_emoji("USA").is_err());
        assert!(flag_emoji("1A").is_err());
    }

    #[tokio::test]
    async fn unknown_host_gets_sentinel() {
        let locator = StaticLocator::with(&[("8.8.8.8", "US")]);
        assert_eq!(label_for(&locator, "8.8.8.8").await, "🇺🇸 US");
        assert_eq!(label_for(&locator, "nowhere.invalid").await, UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn missing_database_never_fails_the_label() {
        let dir = tempfile::tempdir().unwrap();
        let locator = GeoLocator::open(dir.path().join("missing.mmdb"));
        assert!(matches!(
            locator.locate("127.0.0.1").await,
            Err(LocateError::Database(_))
        ));
        assert_eq!(label_for(&locator, "127.0.0.1").await, UNKNOWN_LABEL);
    }

    #[tokio::test]
    async fn literal_addresses_skip_dns() {
        assert_eq!(
            resolve("10.0.0.1").await.unwrap(),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            resolve("10.0.0.1:443").await.unwrap(),
            "10.0.0.1".parse::<IpAddr>().unwrap()
        );
        assert!(resolve("::1").await.unwrap().is_ipv6());
    }
}
