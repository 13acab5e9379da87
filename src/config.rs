use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::parser::SourceFormat;

/// Groups whose members are replaced by the full proxy list.
pub const SELECTABLE_GROUPS: [&str; 15] = [
    "🚀 节点选择",
    "♻️ 自动选择",
    "🔯 故障转移",
    "☁ WARP前置节点",
    "📺 巴哈姆特",
    "📺 哔哩哔哩",
    "🌏 国内媒体",
    "🌍 国外媒体",
    "📲 电报信息",
    "Ⓜ️ 微软云盘",
    "Ⓜ️ 微软服务",
    "🍎 苹果服务",
    "📢 谷歌FCM",
    "🤖 OpenAI",
    "🐟 漏网之鱼",
];

#[derive(Debug, Clone)]
pub struct SourceList {
    pub path: PathBuf,
    pub format: SourceFormat,
}

#[derive(Debug, Clone)]
pub struct ProfileTarget {
    pub template: PathBuf,
    pub output: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub sources: Vec<SourceList>,
    pub profiles: Vec<ProfileTarget>,
    pub share_links: PathBuf,
    pub bundle: PathBuf,
    pub geoip_db: PathBuf,
    pub groups: Vec<&'static str>,
    pub fetch_timeout: Duration,
    pub max_redirects: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let source = |path: &str, format| SourceList {
            path: PathBuf::from(path),
            format,
        };
        let profile = |template: &str, output: &str| ProfileTarget {
            template: PathBuf::from(template),
            output: PathBuf::from(output),
        };

        Self {
            sources: vec![
                source("./urls/clash_meta_urls.txt", SourceFormat::ClashMeta),
                source("./urls/hysteria_urls.txt", SourceFormat::Hysteria),
                source("./urls/hysteria2_urls.txt", SourceFormat::Hysteria2),
                source("./urls/xray_urls.txt", SourceFormat::Xray),
            ],
            profiles: vec![
                profile("./templates/clash_meta.yaml", "./outputs/clash_meta.yaml"),
                profile(
                    "./templates/clash_meta_warp.yaml",
                    "./outputs/clash_meta_warp.yaml",
                ),
            ],
            share_links: PathBuf::from("./outputs/proxy_urls.txt"),
            bundle: PathBuf::from("./outputs/base64.txt"),
            geoip_db: PathBuf::from("./GeoLite2-City.mmdb"),
            groups: SELECTABLE_GROUPS.to_vec(),
            fetch_timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}

/// Read-only view of a template proxy group.
#[derive(Debug, Deserialize)]
pub struct ProxyGroup {
    pub name: String,
    #[serde(rename = "type", default)]
    pub group_type: String,
    #[serde(default)]
    pub proxies: Vec<String>,
}
