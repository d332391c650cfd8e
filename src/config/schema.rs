//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::routing::SiteClass;

/// Root configuration for the caching proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Origins and the hostnames routed to each of them.
    pub upstreams: UpstreamsConfig,

    /// On-disk cache settings.
    pub cache: CacheConfig,

    /// Management API access.
    pub api: ApiConfig,

    /// CORS allow-list.
    pub cors: CorsConfig,

    /// Rewrites applied to fetched documents before caching.
    pub transform: TransformConfig,

    /// Files served verbatim from a local directory.
    pub static_files: StaticFilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// The two site classes and their origins.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// The main site (documents, scripts).
    pub main: SiteConfig,

    /// The resource site (assets).
    pub res: SiteConfig,
}

impl UpstreamsConfig {
    /// Iterate over both sites together with their class.
    pub fn sites(&self) -> [(SiteClass, &SiteConfig); 2] {
        [(SiteClass::Main, &self.main), (SiteClass::Res, &self.res)]
    }
}

/// A single origin and the virtual hosts that map onto it.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SiteConfig {
    /// Origin base URL (e.g., "https://origin.example.com").
    pub target_url: String,

    /// Hostnames (without port) routed to this origin.
    pub hosts: Vec<String>,
}

/// Cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Root directory; one `{site}.site` subtree per site class lives below it.
    pub root_dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: "./_cacheRaw".to_string(),
        }
    }
}

/// Management API configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Host header values allowed to call the refresh-cache endpoint.
    pub allowed_hosts: Vec<String>,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins (scheme://host[:port]) granted `Access-Control-Allow-Origin: *`.
    pub allowed_origins: Vec<String>,
}

/// Root document and worker script rewrites.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Request path of the root document.
    pub root_path: String,

    /// Title set on the root document.
    pub title: String,

    /// Content of the injected `description` meta tag.
    pub description: String,

    /// Content of the injected `keywords` meta tag.
    pub keywords: String,

    /// Script sources injected after the title, in order.
    pub scripts: Vec<String>,

    /// `src` of the analytics script removed from the root document.
    pub removed_script_src: String,

    /// Optional `<base href>` prepended to `<head>`; ignored when empty.
    pub base_href: String,

    /// Request path of the worker script.
    pub worker_script_path: String,

    /// Guard expressions in the worker script replaced with `true`.
    pub worker_guards: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            root_path: "/".to_string(),
            title: "网页红井-联机对战平台".to_string(),
            description: "在网页上就能玩经典的红色井界游戏，无需下载安装，随时随地在手机、电脑、平板甚至手表上畅玩。提供多种游戏模式和地图，与全球玩家实时对战。".to_string(),
            keywords: "红色警戒下载, 如何玩红警, webra2, 苹果如何玩红警, 平板上如何玩红警, 手机上如何玩红警, win7如何玩红警, win10如何玩红警, win11如何玩红警, 红警, 红警2, 红色警戒2, 网页红警, 云红警, 在线游戏, 游戏平台，对战平台，战网, 红色警戒3, 红警3, RA2, RA2WEB".to_string(),
            scripts: vec![
                "lib/nipplejs.js".to_string(),
                "lib/local-trans.js".to_string(),
            ],
            removed_script_src: "https://www.googletagmanager.com/gtag/js?id=G-NT498QGSGZ"
                .to_string(),
            base_href: String::new(),
            worker_script_path: "/dist/workerHost.min.js".to_string(),
            worker_guards: vec![
                "(null===(r=null==t?void 0:t.CORSWorkaround)||void 0===r||r)".to_string(),
                r#""string"==typeof e&&o(e)&&(null===(i=null==t?void 0:t.CORSWorkaround)||void 0===i||i)"#.to_string(),
            ],
        }
    }
}

/// Override files served verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory holding the override files.
    pub dir: String,

    /// Document substituted for upstream 404 responses.
    pub not_found_page: String,

    /// Fixed request paths and the file each one serves.
    pub routes: Vec<StaticRoute>,
}

/// A single override path.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticRoute {
    /// Request path (exact match).
    pub path: String,

    /// File name relative to `StaticFilesConfig::dir`.
    pub file: String,
}

impl StaticRoute {
    fn new(path: &str, file: &str) -> Self {
        Self {
            path: path.to_string(),
            file: file.to_string(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            dir: "overwrite".to_string(),
            not_found_page: "views/404page.html".to_string(),
            routes: vec![
                StaticRoute::new("/config.ini", "config.ini"),
                StaticRoute::new("/breaking-news.html", "breaking-news.html"),
                StaticRoute::new("/lib/local-trans.js", "local-trans.js"),
                StaticRoute::new("/lib/nipplejs.js", "nipplejs.js"),
                StaticRoute::new("/res/locale/zh-CN.json", "zh-CN.json"),
                StaticRoute::new("/res/locale/zh-TW.json", "zh-CN.json"),
                StaticRoute::new("/robots.txt", "robots.txt"),
            ],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Capacity of the access-log queue; records beyond it are dropped.
    pub access_log_capacity: usize,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            access_log_capacity: 1000,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
