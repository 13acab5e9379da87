use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use serde_yaml::Mapping;

use crate::error::{Error, Result};
use crate::parser::Candidate;
use crate::proxy::{GrpcOpts, H2Opts, Proxy, RealityOpts, Vless, Vmess, WsOpts, XhttpOpts};

const VMESS_NETWORKS: [&str; 4] = ["tcp", "ws", "grpc", "h2"];
const VLESS_NETWORKS: [&str; 3] = ["tcp", "ws", "grpc"];

#[derive(Debug, Deserialize)]
struct Document {
    outbounds: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Outbound {
    protocol: String,
    #[serde(default)]
    settings: Value,
    stream_settings: StreamSettings,
}

#[derive(Debug, Deserialize)]
struct VnextSettings {
    vnext: Vec<ServerObject>,
}

#[derive(Debug, Deserialize)]
struct ServerObject {
    address: String,
    port: u16,
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct User {
    id: String,
    alter_id: Option<u32>,
    security: Option<String>,
    flow: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamSettings {
    network: String,
    #[serde(default = "default_security")]
    security: String,
    #[serde(default)]
    tls_settings: TlsSettings,
    #[serde(default)]
    reality_settings: RealitySettings,
    #[serde(default)]
    ws_settings: WsSettings,
    #[serde(default)]
    grpc_settings: GrpcSettings,
    #[serde(default)]
    http_settings: HttpSettings,
    #[serde(default)]
    xhttp_settings: XhttpSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TlsSettings {
    #[serde(default)]
    server_name: String,
    #[serde(default)]
    allow_insecure: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RealitySettings {
    #[serde(default)]
    server_name: String,
    fingerprint: Option<String>,
    public_key: Option<String>,
    #[serde(default)]
    short_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct WsSettings {
    #[serde(default)]
    path: String,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GrpcSettings {
    #[serde(default = "default_root")]
    service_name: String,
}

impl Default for GrpcSettings {
    fn default() -> Self {
        Self {
            service_name: default_root(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HttpSettings {
    #[serde(default = "default_root")]
    path: String,
    #[serde(default)]
    host: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            path: default_root(),
            host: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct XhttpSettings {
    #[serde(default)]
    path: String,
}

fn default_security() -> String {
    "none".to_string()
}

fn default_root() -> String {
    "/".to_string()
}

/// Converts the first outbound of an Xray client config into a proxy record.
pub fn parse(document: &str) -> Result<Candidate> {
    let document: Document = serde_json::from_str(document)?;
    let first = document
        .outbounds
        .into_iter()
        .next()
        .ok_or(Error::MissingField("outbounds[0]"))?;
    let outbound: Outbound = serde_json::from_value(first)?;

    let proxy = match outbound.protocol.as_str() {
        "vmess" => vmess(outbound)?,
        "vless" => vless(outbound)?,
        other => return Err(Error::UnsupportedProtocol(other.to_string())),
    };
    Ok(Candidate::keyed_by_type(proxy))
}

fn first_server(settings: Value) -> Result<(ServerObject, User)> {
    let settings: VnextSettings = serde_json::from_value(settings)?;
    let mut server = settings
        .vnext
        .into_iter()
        .next()
        .ok_or(Error::MissingField("vnext[0]"))?;
    if server.users.is_empty() {
        return Err(Error::MissingField("users[0]"));
    }
    let user = server.users.swap_remove(0);
    Ok((server, user))
}

fn vmess(outbound: Outbound) -> Result<Proxy> {
    let (server, user) = first_server(outbound.settings)?;
    let alter_id = user.alter_id.ok_or(Error::MissingField("alterId"))?;
    let cipher = user.security.ok_or(Error::MissingField("security"))?;
    let stream = outbound.stream_settings;

    if !VMESS_NETWORKS.contains(&stream.network.as_str()) {
        return Err(Error::UnsupportedTransport {
            protocol: "vmess",
            network: stream.network,
        });
    }

    Ok(Proxy::Vmess(Vmess {
        name: String::new(),
        server: server.address,
        port: server.port,
        uuid: user.id,
        alter_id,
        cipher,
        tls: stream.security != "none",
        servername: Some(stream.tls_settings.server_name),
        skip_cert_verify: Some(stream.tls_settings.allow_insecure),
        network: Some(stream.network),
        ws_opts: Some(WsOpts {
            path: stream.ws_settings.path,
            headers: stream.ws_settings.headers,
        }),
        grpc_opts: Some(GrpcOpts {
            service_name: stream.grpc_settings.service_name,
        }),
        h2_opts: Some(H2Opts {
            path: stream.http_settings.path,
            host: stream.http_settings.host,
        }),
        extra: Mapping::new(),
    }))
}

fn vless(outbound: Outbound) -> Result<Proxy> {
    let (server, user) = first_server(outbound.settings)?;
    let stream = outbound.stream_settings;
    let flow = user.flow.filter(|f| !f.is_empty());

    if stream.security == "reality" {
        let reality = stream.reality_settings;
        let fingerprint = reality.fingerprint.ok_or(Error::MissingField("fingerprint"))?;
        let public_key = reality.public_key.ok_or(Error::MissingField("publicKey"))?;

        return Ok(Proxy::Vless(Vless {
            name: String::new(),
            server: server.address,
            port: server.port,
            uuid: user.id,
            flow,
            tls: true,
            servername: Some(reality.server_name),
            skip_cert_verify: None,
            network: Some(stream.network),
            client_fingerprint: Some(fingerprint),
            ws_opts: None,
            grpc_opts: Some(GrpcOpts {
                service_name: stream.grpc_settings.service_name,
            }),
            reality_opts: Some(RealityOpts {
                public_key,
                short_id: reality.short_id,
            }),
            xhttp_opts: Some(XhttpOpts {
                path: stream.xhttp_settings.path,
            }),
            extra: Mapping::new(),
        }));
    }

    if !VLESS_NETWORKS.contains(&stream.network.as_str()) {
        return Err(Error::UnsupportedTransport {
            protocol: "vless",
            network: stream.network,
        });
    }

    Ok(Proxy::Vless(Vless {
        name: String::new(),
        server: server.address,
        port: server.port,
        uuid: user.id,
        flow,
        tls: stream.security != "none",
        servername: Some(stream.tls_settings.server_name),
        skip_cert_verify: Some(stream.tls_settings.allow_insecure),
        network: Some(stream.network),
        client_fingerprint: None,
        ws_opts: Some(WsOpts {
            path: stream.ws_settings.path,
            headers: stream.ws_settings.headers,
        }),
        grpc_opts: Some(GrpcOpts {
            service_name: stream.grpc_settings.service_name,
        }),
        reality_opts: None,
        xhttp_opts: None,
        extra: Mapping::new(),
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const VLESS_REALITY: &str = r#"{
      "outbounds": [{
        "protocol": "vless",
        "settings": {"vnext": [{"address": "r.example", "port": 443,
          "users": [{"id": "0b6a1f4e-0000-4000-8000-000000000001", "flow": "xtls-rprx-vision"}]}]},
        "streamSettings": {
          "network": "tcp",
          "security": "reality",
          "realitySettings": {"serverName": "www.microsoft.com", "fingerprint": "chrome",
            "publicKey": "PBK123", "shortId": "6ba85179"}
        }
      }, {"protocol": "freedom", "tag": "direct"}]
    }"#;

    fn vmess_doc(network: &str) -> String {
        format!(
            r#"{{"outbounds": [{{
              "protocol": "vmess",
              "settings": {{"vnext": [{{"address": "v.example", "port": 8080,
                "users": [{{"id": "uuid-1", "alterId": 0, "security": "auto"}}]}}]}},
              "streamSettings": {{"network": "{}", "security": "tls",
                "tlsSettings": {{"serverName": "sni.example"}},
                "wsSettings": {{"path": "/ws", "headers": {{"Host": "cdn.example"}}}}}}
            }}]}}"#,
            network
        )
    }

    #[test]
    fn vless_reality() {
        let c = parse(VLESS_REALITY).unwrap();
        assert_eq!(c.key.as_str(), "r.example:443-vless");
        let Proxy::Vless(v) = c.proxy else {
            panic!("expected vless");
        };
        assert!(v.tls);
        assert_eq!(v.flow.as_deref(), Some("xtls-rprx-vision"));
        assert_eq!(v.client_fingerprint.as_deref(), Some("chrome"));
        let reality = v.reality_opts.unwrap();
        assert_eq!(reality.public_key, "PBK123");
        assert_eq!(reality.short_id, "6ba85179");
        assert_eq!(v.servername.as_deref(), Some("www.microsoft.com"));
    }

    #[test]
    fn reality_requires_public_key() {
        let doc = VLESS_REALITY.replace(r#""publicKey": "PBK123", "#, "");
        assert!(matches!(parse(&doc), Err(Error::MissingField("publicKey"))));
    }

    #[test]
    fn vmess_populates_every_transport_block() {
        let c = parse(&vmess_doc("ws")).unwrap();
        assert_eq!(c.key.as_str(), "v.example:8080-vmess");
        let Proxy::Vmess(v) = c.proxy else {
            panic!("expected vmess");
        };
        assert!(v.tls);
        assert_eq!(v.cipher, "auto");
        assert_eq!(v.ws_opts.unwrap().host(), Some("cdn.example"));
        assert_eq!(v.grpc_opts.unwrap().service_name, "/");
        assert_eq!(v.h2_opts.unwrap().path, "/");
    }

    #[test]
    fn vmess_quic_is_rejected() {
        let err = parse(&vmess_doc("quic")).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedTransport { protocol: "vmess", ref network } if network == "quic"
        ));
    }

    #[test]
    fn vless_without_tls_settings() {
        let doc = r#"{"outbounds": [{"protocol": "vless",
            "settings": {"vnext": [{"address": "p.example", "port": 80, "users": [{"id": "u"}]}]},
            "streamSettings": {"network": "grpc"}}]}"#;
        let Proxy::Vless(v) = parse(doc).unwrap().proxy else {
            panic!("expected vless");
        };
        assert!(!v.tls);
        assert_eq!(v.skip_cert_verify, Some(false));
        assert_eq!(v.grpc_opts.unwrap().service_name, "/");
        assert!(v.flow.is_none());
    }

    #[test]
    fn vless_xhttp_without_reality_is_rejected() {
        let doc = r#"{"outbounds": [{"protocol": "vless",
            "settings": {"vnext": [{"address": "p.example", "port": 80, "users": [{"id": "u"}]}]},
            "streamSettings": {"network": "xhttp", "security": "tls"}}]}"#;
        assert!(matches!(parse(doc), Err(Error::UnsupportedTransport { .. })));
    }

    #[test]
    fn other_protocols_are_rejected() {
        let doc = r#"{"outbounds": [{"protocol": "trojan", "streamSettings": {"network": "tcp"}}]}"#;
        assert!(matches!(parse(doc), Err(Error::UnsupportedProtocol(ref p)) if p == "trojan"));
    }

    #[test]
    fn vmess_requires_alter_id() {
        let doc = vmess_doc("tcp").replace(r#""alterId": 0, "#, "");
        assert!(matches!(parse(&doc), Err(Error::MissingField("alterId"))));
    }
}
