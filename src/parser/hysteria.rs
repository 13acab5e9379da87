use serde::Deserialize;
use serde_yaml::Mapping;

use crate::error::Result;
use crate::parser::{Candidate, parse_port, split_server};
use crate::proxy::{Bandwidth, Hysteria, Hysteria2, Ports, Proxy};

// 固定带宽提示，不从源文档读取
const UP_MBPS: u64 = 80;
const DOWN_MBPS: u64 = 100;

#[derive(Debug, Deserialize)]
struct V1Document {
    auth_str: String,
    server: String,
    #[serde(default = "default_fast_open")]
    fast_open: bool,
    insecure: bool,
    server_name: String,
    alpn: Alpn,
    protocol: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Alpn {
    One(String),
    Many(Vec<String>),
}

impl From<Alpn> for Vec<String> {
    fn from(alpn: Alpn) -> Self {
        match alpn {
            Alpn::One(v) => vec![v],
            Alpn::Many(v) => v,
        }
    }
}

fn default_fast_open() -> bool {
    true
}

pub fn parse_v1(document: &str) -> Result<Candidate> {
    let doc: V1Document = serde_json::from_str(document)?;
    let (host, ports) = split_server(&doc.server)?;
    let mut segments = ports.split(',');
    let port = parse_port(segments.next().unwrap_or_default())?;
    let hop = segments.next().map(Ports::parse).unwrap_or(Ports::Single(port));

    let proxy = Proxy::Hysteria(Hysteria {
        name: String::new(),
        server: host.to_string(),
        port,
        ports: Some(hop),
        auth_str: Some(doc.auth_str),
        up: Some(Bandwidth::Mbps(UP_MBPS)),
        down: Some(Bandwidth::Mbps(DOWN_MBPS)),
        fast_open: Some(doc.fast_open),
        protocol: Some(doc.protocol),
        sni: Some(doc.server_name),
        skip_cert_verify: doc.insecure,
        alpn: doc.alpn.into(),
        obfs: None,
        extra: Mapping::new(),
    });
    Ok(Candidate::keyed_by_type(proxy))
}

#[derive(Debug, Deserialize)]
struct V2Document {
    auth: String,
    server: String,
    tls: V2Tls,
}

#[derive(Debug, Deserialize)]
struct V2Tls {
    insecure: bool,
    sni: String,
}

pub fn parse_v2(document: &str) -> Result<Candidate> {
    let doc: V2Document = serde_json::from_str(document)?;
    let (host, ports) = split_server(&doc.server)?;
    let port = parse_port(ports.split(',').next().unwrap_or_default())?;

    let proxy = Proxy::Hysteria2(Hysteria2 {
        name: String::new(),
        server: host.to_string(),
        port,
        password: doc.auth,
        sni: Some(doc.tls.sni),
        skip_cert_verify: doc.tls.insecure,
        obfs: None,
        obfs_password: None,
        extra: Mapping::new(),
    });
    Ok(Candidate::keyed_by_type(proxy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn v1_with_hop_port() {
        let c = parse_v1(
            r#"{"server":"h.example:443,20000-30000","auth_str":"a","insecure":false,
                "server_name":"sni.example","alpn":"h3","protocol":"udp"}"#,
        )
        .unwrap();
        assert_eq!(c.key.as_str(), "h.example:443-hysteria");
        let Proxy::Hysteria(h) = c.proxy else {
            panic!("expected hysteria");
        };
        assert_eq!(h.port, 443);
        assert_eq!(h.ports, Some(Ports::Range("20000-30000".into())));
        assert_eq!(h.fast_open, Some(true));
        assert_eq!(h.up, Some(Bandwidth::Mbps(80)));
        assert_eq!(h.down, Some(Bandwidth::Mbps(100)));
        assert_eq!(h.alpn, vec!["h3"]);
        assert_eq!(h.sni.as_deref(), Some("sni.example"));
    }

    #[test]
    fn v1_hop_port_defaults_to_primary() {
        let c = parse_v1(
            r#"{"server":"1.1.1.1:8443","auth_str":"a","fast_open":false,"insecure":true,
                "server_name":"s","alpn":["h3","h2"],"protocol":"wechat-video"}"#,
        )
        .unwrap();
        let Proxy::Hysteria(h) = c.proxy else {
            panic!("expected hysteria");
        };
        assert_eq!(h.ports, Some(Ports::Single(8443)));
        assert_eq!(h.fast_open, Some(false));
        assert!(h.skip_cert_verify);
        assert_eq!(h.alpn, vec!["h3", "h2"]);
    }

    #[test]
    fn v1_requires_auth() {
        let err = parse_v1(
            r#"{"server":"1.1.1.1:8443","insecure":true,"server_name":"s","alpn":"h3","protocol":"udp"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn v2_uses_first_port_only() {
        let c = parse_v2(
            r#"{"server":"1.2.3.4:443,5000-6000","auth":"pw","tls":{"insecure":true,"sni":"x.example"}}"#,
        )
        .unwrap();
        assert_eq!(c.key.as_str(), "1.2.3.4:443-hysteria2");
        let Proxy::Hysteria2(h) = c.proxy else {
            panic!("expected hysteria2");
        };
        assert_eq!(h.password, "pw");
        assert_eq!(h.sni.as_deref(), Some("x.example"));
        assert!(h.skip_cert_verify);
    }

    #[test]
    fn v2_rejects_bad_port() {
        assert!(
            parse_v2(r#"{"server":"1.2.3.4:http","auth":"pw","tls":{"insecure":true,"sni":"x"}}"#)
                .is_err()
        );
    }
}
