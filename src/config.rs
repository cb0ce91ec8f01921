use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigurationError;

/// 默认工作线程数
pub const DEFAULT_THREADS: usize = 10;
/// 默认编译超时（分钟）
pub const DEFAULT_TIMEOUT_MINUTES: u64 = 30;

/// 程序配置
///
/// 加载顺序：默认值 → `JSPC_CONFIG_FILE` 指定的 TOML 文件 → `JSPC_*` 环境变量
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Web 应用根目录；为空时从第一个 JSP 推断
    pub uri_root: Option<PathBuf>,
    /// 显式指定的 JSP（相对根目录或绝对路径）；为空时扫描整个根目录
    pub pages: Vec<String>,
    /// 扫描时识别的扩展名
    pub extensions: Vec<String>,
    /// 生成代码的输出目录
    pub output_dir: PathBuf,
    /// 生成 Servlet 的包名
    pub package_name: String,
    /// web.xml 片段输出路径
    pub web_xml_fragment: Option<PathBuf>,
    /// 合并目标 web.xml，默认 `<root>/WEB-INF/web.xml`
    pub web_xml: Option<PathBuf>,
    /// 是否把映射合并进 web.xml
    pub add_web_xml_mappings: bool,
    /// 外部单文件编译命令（第一个元素为程序）
    pub compiler_command: Vec<String>,
    /// 工作线程数
    pub threads: usize,
    /// 等待编译完成的超时时间（分钟）
    pub compilation_timeout_minutes: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            uri_root: None,
            pages: Vec::new(),
            extensions: vec!["jsp".to_string(), "jspx".to_string()],
            output_dir: PathBuf::from("target/jspc"),
            package_name: "org.apache.jsp".to_string(),
            web_xml_fragment: None,
            web_xml: None,
            add_web_xml_mappings: false,
            compiler_command: Vec::new(),
            threads: DEFAULT_THREADS,
            compilation_timeout_minutes: DEFAULT_TIMEOUT_MINUTES,
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 加载完整配置（文件 + 环境变量）
    pub fn load() -> Result<Self, ConfigurationError> {
        let base = match std::env::var("JSPC_CONFIG_FILE") {
            Ok(path) => Self::from_toml_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        Ok(base.with_env())
    }

    /// 从 TOML 文件加载，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigurationError::ConfigFileRead {
                path: path.to_path_buf(),
                source,
            })?;
        toml::from_str(&content).map_err(|source| ConfigurationError::ConfigFileParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 用 `JSPC_*` 环境变量覆盖当前配置
    pub fn with_env(self) -> Self {
        let base = self;
        Self {
            uri_root: env_var("JSPC_URI_ROOT").map(PathBuf::from).or(base.uri_root),
            pages: env_var("JSPC_PAGES").map(|v| split_list(&v, ',')).unwrap_or(base.pages),
            extensions: env_var("JSPC_EXTENSIONS").map(|v| split_list(&v, ',')).unwrap_or(base.extensions),
            output_dir: env_var("JSPC_OUTPUT_DIR").map(PathBuf::from).unwrap_or(base.output_dir),
            package_name: env_var("JSPC_PACKAGE").unwrap_or(base.package_name),
            web_xml_fragment: env_var("JSPC_WEB_XML_FRAGMENT").map(PathBuf::from).or(base.web_xml_fragment),
            web_xml: env_var("JSPC_WEB_XML").map(PathBuf::from).or(base.web_xml),
            add_web_xml_mappings: env_var("JSPC_ADD_WEB_XML_MAPPINGS").and_then(|v| v.parse().ok()).unwrap_or(base.add_web_xml_mappings),
            compiler_command: env_var("JSPC_COMPILER_COMMAND").map(|v| v.split_whitespace().map(str::to_string).collect()).unwrap_or(base.compiler_command),
            threads: env_var("JSPC_THREADS").and_then(|v| v.parse().ok()).unwrap_or(base.threads),
            compilation_timeout_minutes: env_var("JSPC_TIMEOUT_MINUTES").and_then(|v| v.parse().ok()).unwrap_or(base.compilation_timeout_minutes),
            verbose_logging: env_var("VERBOSE_LOGGING").and_then(|v| v.parse().ok()).unwrap_or(base.verbose_logging),
        }
    }

    /// 校验并生成线程池配置
    pub fn pool_config(&self) -> Result<PoolConfig, ConfigurationError> {
        PoolConfig::new(
            self.threads,
            Duration::from_secs(self.compilation_timeout_minutes.saturating_mul(60)),
        )
    }
}

/// 线程池配置（运行开始后不可变）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    thread_count: usize,
    timeout: Duration,
}

impl PoolConfig {
    pub fn new(thread_count: usize, timeout: Duration) -> Result<Self, ConfigurationError> {
        if thread_count == 0 {
            return Err(ConfigurationError::InvalidThreadCount(thread_count));
        }
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout);
        }
        Ok(Self {
            thread_count,
            timeout,
        })
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            thread_count: DEFAULT_THREADS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_MINUTES * 60),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        let pool = config.pool_config().expect("默认配置应该合法");
        assert_eq!(pool.thread_count(), 10);
        assert_eq!(pool.timeout(), Duration::from_secs(30 * 60));
        assert_eq!(config.extensions, vec!["jsp", "jspx"]);
    }

    #[test]
    fn parses_partial_toml() {
        let config: Config = toml::from_str(
            r#"
            uri_root = "/srv/app"
            pages = ["index.jsp", "admin/users.jsp"]
            threads = 4
            add_web_xml_mappings = true
            compiler_command = ["jasper-single", "{page}", "{output}"]
            "#,
        )
        .expect("TOML 应该能解析");

        assert_eq!(config.uri_root, Some(PathBuf::from("/srv/app")));
        assert_eq!(config.pages.len(), 2);
        assert_eq!(config.threads, 4);
        assert!(config.add_web_xml_mappings);
        assert_eq!(config.compilation_timeout_minutes, DEFAULT_TIMEOUT_MINUTES);
        assert_eq!(config.package_name, "org.apache.jsp");
    }

    #[test]
    fn rejects_zero_threads_and_timeout() {
        let config = Config {
            threads: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.pool_config(),
            Err(ConfigurationError::InvalidThreadCount(0))
        ));

        let config = Config {
            compilation_timeout_minutes: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.pool_config(),
            Err(ConfigurationError::InvalidTimeout)
        ));
    }

    #[test]
    fn split_list_drops_blanks() {
        assert_eq!(split_list(" a.jsp, ,b.jsp ,", ','), vec!["a.jsp", "b.jsp"]);
    }
}
