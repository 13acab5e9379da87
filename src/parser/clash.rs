use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, Result};
use crate::parser::{Candidate, Entries};
use crate::proxy::{Proxy, UniqueKey};

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    proxies: Vec<Value>,
}

/// Extracts every entry of a Clash Meta `proxies` list.
///
/// Only `type`, `server` and `port` are required. An entry lacking one of them (or a ws entry
/// without a host header) ends extraction for the rest of the document; any other bad entry is
/// reported on its own and its siblings continue.
pub fn parse(document: &str) -> Result<Entries> {
    let document: Document = serde_yaml::from_str(document)?;
    let mut entries = Vec::with_capacity(document.proxies.len());

    for raw in document.proxies {
        if let Err(e) = required_fields(&raw) {
            entries.push(Err(e));
            break;
        }
        match candidate(raw) {
            Ok(c) => entries.push(Ok(c)),
            Err(e @ Error::MissingField(_)) => {
                entries.push(Err(e));
                break;
            }
            Err(e) => entries.push(Err(e)),
        }
    }
    Ok(entries)
}

fn required_fields(raw: &Value) -> Result<()> {
    for field in ["type", "server", "port"] {
        match raw.get(field) {
            None | Some(Value::Null) => return Err(Error::MissingField(field)),
            Some(_) => {}
        }
    }
    Ok(())
}

fn candidate(raw: Value) -> Result<Candidate> {
    let proxy: Proxy = serde_yaml::from_value(raw)?;
    if proxy.network() == Some("ws") {
        let host = proxy.ws_host().ok_or(Error::MissingField("ws-opts.headers.host"))?;
        let key = UniqueKey::ws_host(proxy.server(), proxy.port(), host);
        return Ok(Candidate { key, proxy });
    }
    Ok(Candidate::keyed_by_type(proxy))
}
