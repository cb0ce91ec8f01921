//! web.xml 描述文件服务 - 业务能力层
//!
//! 收集每个编译成功的 JSP 的 Servlet 映射，
//! 在所有任务结束后写出片段文件，并可选地合并进 web.xml

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use regex::Regex;
use tracing::{debug, info};

use crate::error::{CompileError, FinalizeError};

const INSERT_START: &str = "<!-- parallel-jspc servlet mappings start -->";
const INSERT_END: &str = "<!-- parallel-jspc servlet mappings end -->";

/// 在 web.xml 中必须排在 servlet 声明之后的元素
const INSERT_BEFORE: &[&str] = &[
    "<servlet>",
    "<servlet-mapping>",
    "<session-config>",
    "<mime-mapping>",
    "<welcome-file-list>",
    "<error-page>",
    "<taglib>",
    "<resource-env-ref>",
    "<resource-ref>",
    "<security-constraint>",
    "<login-config>",
    "<security-role>",
    "<env-entry>",
    "<ejb-ref>",
    "<ejb-local-ref>",
    "</web-app>",
];

/// 描述文件协作者
///
/// `init` 在线程池启动前调用；`complete` / `merge` 只在全部成功时各调用至多一次
pub trait WebDescriptor: Send + Sync {
    fn init(&self, _root: &Path) -> Result<(), FinalizeError> {
        Ok(())
    }

    fn complete(&self, root: &Path) -> Result<(), FinalizeError>;

    fn merge(&self, root: &Path) -> Result<(), FinalizeError>;
}

/// 一条 Servlet 映射
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServletMapping {
    pub servlet_class: String,
    pub url_pattern: String,
}

/// web.xml 片段
pub struct WebXmlFragment {
    fragment_path: Option<PathBuf>,
    web_xml_path: Option<PathBuf>,
    mappings: Mutex<Vec<ServletMapping>>,
}

impl WebXmlFragment {
    /// 创建新的片段服务
    ///
    /// # 参数
    /// - `fragment_path`: 片段输出路径，为空时不写片段文件
    /// - `web_xml_path`: 合并目标，为空时使用 `<root>/WEB-INF/web.xml`
    pub fn new(fragment_path: Option<PathBuf>, web_xml_path: Option<PathBuf>) -> Self {
        Self {
            fragment_path,
            web_xml_path,
            mappings: Mutex::new(Vec::new()),
        }
    }

    /// 记录一条映射（可在多个工作线程中并发调用）
    pub fn record(&self, servlet_class: impl Into<String>, url_pattern: impl Into<String>) {
        let mapping = ServletMapping {
            servlet_class: servlet_class.into(),
            url_pattern: url_pattern.into(),
        };
        debug!("记录映射: {} → {}", mapping.url_pattern, mapping.servlet_class);
        self.lock().push(mapping);
    }

    /// 按 URI 排序后的映射
    pub fn mappings(&self) -> Vec<ServletMapping> {
        let mut mappings = self.lock().clone();
        mappings.sort_by(|a, b| a.url_pattern.cmp(&b.url_pattern));
        mappings
    }

    /// servlet 与 servlet-mapping 元素
    pub fn render_entries(&self) -> String {
        let mappings = self.mappings();
        let mut out = String::new();
        for m in &mappings {
            out.push_str("    <servlet>\n");
            out.push_str(&format!("        <servlet-name>{}</servlet-name>\n", m.servlet_class));
            out.push_str(&format!("        <servlet-class>{}</servlet-class>\n", m.servlet_class));
            out.push_str("    </servlet>\n");
        }
        for m in &mappings {
            out.push_str("    <servlet-mapping>\n");
            out.push_str(&format!("        <servlet-name>{}</servlet-name>\n", m.servlet_class));
            out.push_str(&format!("        <url-pattern>{}</url-pattern>\n", escape_xml(&m.url_pattern)));
            out.push_str("    </servlet-mapping>\n");
        }
        out
    }

    /// 完整的片段文件内容
    pub fn render_fragment(&self) -> String {
        format!(
            "\n<!--\nGenerated by parallel-jspc on {}.\nPlace these elements in web.xml ahead of session-config, mime-mapping,\nwelcome-file-list, error-page and security elements.\n-->\n{}\n<!--\nEnd of generated servlet declarations.\n-->\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            self.render_entries()
        )
    }

    /// 把映射插入到已有的 web.xml 文本中
    ///
    /// 已有标记区域时整体替换，否则插入到第一个必须排在 servlet 之后的元素前
    pub fn merge_text(&self, web_xml: &str) -> Result<String, CompileError> {
        let block = format!("{}\n{}    {}", INSERT_START, self.render_entries(), INSERT_END);

        let region = Regex::new(&format!(
            "(?s){}.*?{}",
            regex::escape(INSERT_START),
            regex::escape(INSERT_END)
        ))
        .map_err(|e| CompileError::with_cause("invalid merge marker pattern", e))?;
        if region.is_match(web_xml) {
            return Ok(region.replace(web_xml, regex::NoExpand(&block)).into_owned());
        }

        let position = INSERT_BEFORE
            .iter()
            .filter_map(|tag| web_xml.find(tag))
            .min()
            .ok_or_else(|| CompileError::new("web.xml has no </web-app> element"))?;

        let mut merged = String::with_capacity(web_xml.len() + block.len() + 8);
        merged.push_str(&web_xml[..position]);
        merged.push_str(&block);
        merged.push_str("\n    ");
        merged.push_str(&web_xml[position..]);
        Ok(merged)
    }

    fn web_xml_path(&self, root: &Path) -> PathBuf {
        self.web_xml_path
            .clone()
            .unwrap_or_else(|| root.join("WEB-INF").join("web.xml"))
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ServletMapping>> {
        self.mappings.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WebDescriptor for WebXmlFragment {
    fn init(&self, _root: &Path) -> Result<(), FinalizeError> {
        self.lock().clear();
        if let Some(parent) = self.fragment_path.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    fn complete(&self, _root: &Path) -> Result<(), FinalizeError> {
        if let Some(path) = &self.fragment_path {
            fs::write(path, self.render_fragment())?;
            info!("📝 已写出 web.xml 片段: {}", path.display());
        }
        Ok(())
    }

    fn merge(&self, root: &Path) -> Result<(), FinalizeError> {
        let path = self.web_xml_path(root);
        let original = fs::read_to_string(&path)?;
        let merged = self.merge_text(&original)?;
        fs::write(&path, merged)?;
        info!("📝 已合并映射到: {}", path.display());
        Ok(())
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fragment_with_two() -> WebXmlFragment {
        let fragment = WebXmlFragment::new(None, None);
        fragment.record("org.apache.jsp.b_jsp", "/b.jsp");
        fragment.record("org.apache.jsp.a_jsp", "/a.jsp");
        fragment
    }

    #[test]
    fn entries_are_sorted_by_uri() {
        let entries = fragment_with_two().render_entries();
        let a = entries.find("org.apache.jsp.a_jsp").expect("应该包含 a");
        let b = entries.find("org.apache.jsp.b_jsp").expect("应该包含 b");
        assert!(a < b);
        assert_eq!(entries.matches("<servlet>").count(), 2);
        assert_eq!(entries.matches("<servlet-mapping>").count(), 2);
    }

    #[test]
    fn merge_inserts_before_first_following_element() {
        let web_xml = "<web-app>\n    <display-name>x</display-name>\n    <welcome-file-list>\n    </welcome-file-list>\n    <servlet>\n    </servlet>\n</web-app>\n";
        let merged = fragment_with_two().merge_text(web_xml).expect("合并失败");

        let start = merged.find(INSERT_START).expect("应该有开始标记");
        assert!(start > merged.find("<display-name>").expect("display-name"));
        assert!(start < merged.find("<welcome-file-list>").expect("welcome"));
        assert!(merged.contains("<url-pattern>/a.jsp</url-pattern>"));
    }

    #[test]
    fn merge_replaces_existing_region() {
        let fragment = fragment_with_two();
        let once = fragment
            .merge_text("<web-app>\n</web-app>\n")
            .expect("合并失败");
        let twice = fragment.merge_text(&once).expect("合并失败");

        assert_eq!(once, twice);
        assert_eq!(twice.matches(INSERT_START).count(), 1);
    }

    #[test]
    fn merge_requires_web_app_element() {
        let err = fragment_with_two()
            .merge_text("<not-a-descriptor/>")
            .expect_err("应该失败");
        assert!(err.to_string().contains("</web-app>"));
    }

    #[test]
    fn complete_writes_fragment_file() {
        let dir = TempDir::new().expect("创建临时目录失败");
        let path = dir.path().join("out/generated_web.xml");
        let fragment = WebXmlFragment::new(Some(path.clone()), None);

        fragment.init(dir.path()).expect("初始化失败");
        fragment.record("org.apache.jsp.index_jsp", "/index.jsp");
        fragment.complete(dir.path()).expect("写出失败");

        let written = fs::read_to_string(path).expect("读取失败");
        assert!(written.contains("<servlet-class>org.apache.jsp.index_jsp</servlet-class>"));
    }

    #[test]
    fn merge_uses_default_web_xml_location() {
        let dir = TempDir::new().expect("创建临时目录失败");
        fs::create_dir_all(dir.path().join("WEB-INF")).expect("创建目录失败");
        fs::write(dir.path().join("WEB-INF/web.xml"), "<web-app>\n</web-app>\n")
            .expect("写入失败");

        let fragment = fragment_with_two();
        fragment.merge(dir.path()).expect("合并失败");

        let merged = fs::read_to_string(dir.path().join("WEB-INF/web.xml")).expect("读取失败");
        assert!(merged.contains(INSERT_END));
    }
}
