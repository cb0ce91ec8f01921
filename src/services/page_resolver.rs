//! 页面解析服务 - 业务能力层
//!
//! 只负责"确定根目录、找到要编译的 JSP"，不关心并发

use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{BuildResult, ConfigurationError};
use crate::models::CompilationJob;

/// 标识 Web 应用根目录的子目录
const WEB_INF: &str = "WEB-INF";

/// 页面解析服务
pub struct PageResolver {
    extensions: Vec<String>,
}

impl PageResolver {
    /// 创建新的页面解析服务
    ///
    /// # 参数
    /// - `extensions`: 扫描时识别的扩展名（不带点，大小写不敏感）
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    /// 收集候选页面：显式列表原样使用，否则扫描根目录
    pub fn candidates(&self, root: &Path, explicit_pages: &[String]) -> BuildResult<Vec<PathBuf>> {
        if explicit_pages.is_empty() {
            self.scan(root)
        } else {
            Ok(explicit_pages.iter().map(PathBuf::from).collect())
        }
    }

    /// 确定根目录
    ///
    /// 未指定根目录时，从第一个显式 JSP 向上查找包含 `WEB-INF` 的目录，
    /// 找不到时返回 `NoUriRoot`。返回规范化后的绝对路径。
    pub fn resolve_root(
        &self,
        uri_root: Option<&Path>,
        explicit_pages: &[String],
    ) -> BuildResult<PathBuf> {
        let root = match uri_root {
            Some(root) => root.to_path_buf(),
            None => {
                let first = explicit_pages
                    .first()
                    .ok_or(ConfigurationError::MissingTarget)?;
                let first_path = Path::new(first);
                if !first_path.exists() {
                    return Err(ConfigurationError::FileDoesNotExist {
                        path: first_path.to_path_buf(),
                    }
                    .into());
                }
                let root = locate_uri_root(first_path)?.ok_or(ConfigurationError::NoUriRoot)?;
                info!("📁 推断出的根目录: {}", root.display());
                root
            }
        };

        if !root.is_dir() {
            return Err(ConfigurationError::UriRootNotDir { path: root }.into());
        }
        Ok(root.canonicalize()?)
    }

    /// 递归扫描根目录下所有 JSP
    ///
    /// 每一层按文件名排序，目录树不变时结果顺序不变。
    /// 符号链接会被跟随，路径仍保留链接在根目录下的位置。
    pub fn scan(&self, root: &Path) -> BuildResult<Vec<PathBuf>> {
        info!("📁 正在扫描 {} 下的 JSP...", root.display());

        let mut pages = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.loop_ancestor().is_some() => {
                    warn!("⚠️ 跳过循环链接: {}", err);
                    continue;
                }
                Err(err) => return Err(io::Error::from(err).into()),
            };
            if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                pages.push(entry.into_path());
            }
        }

        info!("✓ 找到 {} 个 JSP", pages.len());
        Ok(pages)
    }

    /// 把候选路径转换为编译任务
    ///
    /// 不存在的文件和根目录之外的文件只记录警告，不会导致失败
    pub fn resolve_jobs(&self, root: &Path, candidates: &[PathBuf]) -> Vec<CompilationJob> {
        let mut jobs = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let absolute = lexical_absolute(root, candidate);
            if !absolute.is_file() {
                warn!("⚠️ 文件不存在: {}", absolute.display());
                continue;
            }

            // 根目录已规范化；前缀不一致（如经过目录链接）时再用规范化的父目录匹配一次
            let job = CompilationJob::new(root, absolute.clone())
                .or_else(|| CompilationJob::new(root, canonical_parent(&absolute)?));
            match job {
                Some(job) => {
                    debug!("加入编译任务: {}", job);
                    jobs.push(job);
                }
                None => warn!(
                    "⚠️ 文件不在根目录 {} 之下，已跳过: {}",
                    root.display(),
                    candidate.display()
                ),
            }
        }
        jobs
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }
}

impl Default for PageResolver {
    fn default() -> Self {
        Self::new(["jsp", "jspx"])
    }
}

/// 从文件向上查找包含 `WEB-INF` 的最近祖先目录
fn locate_uri_root(page: &Path) -> io::Result<Option<PathBuf>> {
    let page = page.canonicalize()?;
    let web_app = page
        .ancestors()
        .skip(1)
        .find(|dir| dir.join(WEB_INF).is_dir())
        .map(Path::to_path_buf);
    Ok(web_app)
}

/// 不解析符号链接的绝对路径：相对路径以根目录为基准，`.` 和 `..` 按字面消去
fn lexical_absolute(root: &Path, candidate: &Path) -> PathBuf {
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// 只规范化父目录，保留文件名本身（文件可能是指向根目录外的链接）
fn canonical_parent(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?.canonicalize().ok()?;
    Some(parent.join(path.file_name()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().expect("应该有父目录")).expect("创建目录失败");
        fs::write(path, "<%@ page %>").expect("写入文件失败");
    }

    #[test]
    fn scan_is_sorted_and_filtered() {
        let dir = TempDir::new().expect("创建临时目录失败");
        touch(dir.path(), "b.jsp");
        touch(dir.path(), "a.jsp");
        touch(dir.path(), "admin/z.JSPX");
        touch(dir.path(), "admin/readme.txt");
        touch(dir.path(), "WEB-INF/web.xml");

        let resolver = PageResolver::default();
        let root = dir.path().canonicalize().expect("规范化失败");
        let pages = resolver.scan(&root).expect("扫描失败");
        let jobs = resolver.resolve_jobs(&root, &pages);
        let uris: Vec<String> = jobs.iter().map(CompilationJob::uri).collect();

        assert_eq!(uris, vec!["/a.jsp", "/admin/z.JSPX", "/b.jsp"]);
    }

    #[test]
    fn missing_and_outside_pages_are_skipped() {
        let app = TempDir::new().expect("创建临时目录失败");
        let other = TempDir::new().expect("创建临时目录失败");
        touch(app.path(), "index.jsp");
        touch(other.path(), "outside.jsp");

        let resolver = PageResolver::default();
        let root = app.path().canonicalize().expect("规范化失败");
        let candidates = vec![
            PathBuf::from("./index.jsp"),
            PathBuf::from("missing.jsp"),
            other.path().join("outside.jsp"),
        ];
        let jobs = resolver.resolve_jobs(&root, &candidates);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].uri(), "/index.jsp");
    }

    #[test]
    fn infers_root_from_web_inf_ancestor() {
        let dir = TempDir::new().expect("创建临时目录失败");
        touch(dir.path(), "WEB-INF/web.xml");
        touch(dir.path(), "pages/deep/view.jsp");

        let first = dir.path().join("pages/deep/view.jsp");
        let resolver = PageResolver::default();
        let root = resolver
            .resolve_root(None, &[first.to_string_lossy().into_owned()])
            .expect("应该能推断根目录");

        assert_eq!(root, dir.path().canonicalize().expect("规范化失败"));
    }

    #[test]
    fn no_web_inf_ancestor_means_no_uri_root() {
        let dir = TempDir::new().expect("创建临时目录失败");
        touch(dir.path(), "site/index.jsp");

        let first = dir.path().join("site/index.jsp");
        let resolver = PageResolver::default();
        let err = resolver
            .resolve_root(None, &[first.to_string_lossy().into_owned()])
            .expect_err("没有 WEB-INF 时应该失败");

        assert!(matches!(
            err,
            BuildError::Configuration(ConfigurationError::NoUriRoot)
        ));
    }

    #[test]
    fn explicit_pages_are_used_verbatim() {
        let dir = TempDir::new().expect("创建临时目录失败");
        touch(dir.path(), "b.jsp");
        touch(dir.path(), "a.jsp");

        let resolver = PageResolver::default();
        let root = resolver
            .resolve_root(Some(dir.path()), &[])
            .expect("根目录应该合法");
        let explicit = vec!["b.jsp".to_string(), "./a.jsp".to_string()];
        let candidates = resolver.candidates(&root, &explicit).expect("收集失败");
        let jobs = resolver.resolve_jobs(&root, &candidates);

        assert_eq!(root, dir.path().canonicalize().expect("规范化失败"));
        let uris: Vec<String> = jobs.iter().map(CompilationJob::uri).collect();
        assert_eq!(uris, vec!["/b.jsp", "/a.jsp"]);
    }

    #[test]
    fn parent_components_are_resolved_lexically() {
        let dir = TempDir::new().expect("创建临时目录失败");
        touch(dir.path(), "admin/index.jsp");

        let resolver = PageResolver::default();
        let root = dir.path().canonicalize().expect("规范化失败");
        let jobs = resolver.resolve_jobs(&root, &[PathBuf::from("admin/../admin/./index.jsp")]);

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].uri(), "/admin/index.jsp");
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_page_inside_root_is_kept() {
        let app = TempDir::new().expect("创建临时目录失败");
        let shared = TempDir::new().expect("创建临时目录失败");
        touch(shared.path(), "common.jsp");
        touch(app.path(), "index.jsp");
        std::os::unix::fs::symlink(
            shared.path().join("common.jsp"),
            app.path().join("common.jsp"),
        )
        .expect("创建符号链接失败");

        let resolver = PageResolver::default();
        let root = app.path().canonicalize().expect("规范化失败");

        let explicit = resolver.resolve_jobs(&root, &[PathBuf::from("common.jsp")]);
        assert_eq!(explicit.len(), 1);
        assert_eq!(explicit[0].uri(), "/common.jsp");
        assert_eq!(explicit[0].absolute_path(), root.join("common.jsp"));

        let scanned = resolver.scan(&root).expect("扫描失败");
        let jobs = resolver.resolve_jobs(&root, &scanned);
        let uris: Vec<String> = jobs.iter().map(CompilationJob::uri).collect();
        assert_eq!(uris, vec!["/common.jsp", "/index.jsp"]);
    }

    #[test]
    fn root_errors_are_configuration_errors() {
        let resolver = PageResolver::default();

        let err = resolver.resolve_root(None, &[]).expect_err("应该失败");
        assert!(err.to_string().contains("missing target"));

        let err = resolver
            .resolve_root(None, &["/definitely/not/here.jsp".to_string()])
            .expect_err("应该失败");
        assert!(err.is_configuration());

        let dir = TempDir::new().expect("创建临时目录失败");
        touch(dir.path(), "file.jsp");
        let err = resolver
            .resolve_root(Some(&dir.path().join("file.jsp")), &[])
            .expect_err("应该失败");
        assert!(err.is_configuration());
    }
}
