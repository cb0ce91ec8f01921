//! 编译任务
//!
//! 一个 `CompilationJob` 对应根目录下的一个 JSP，
//! 以规范化后的相对路径作为身份标识。

use std::fmt::{self, Display};
use std::path::{Component, Path, PathBuf};

/// Java 保留字，生成类名时需要避开
const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

/// 编译任务（创建后不可变，由线程池消费一次）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompilationJob {
    /// 绝对路径
    absolute_path: PathBuf,
    /// 相对于根目录的路径（已去掉根目录前缀和开头的 `./`）
    relative_path: PathBuf,
}

impl CompilationJob {
    /// 由根目录和绝对路径创建任务
    ///
    /// 如果 `absolute_path` 不在 `root` 之下，返回 `None`
    pub fn new(root: &Path, absolute_path: PathBuf) -> Option<Self> {
        let relative = absolute_path.strip_prefix(root).ok()?;
        let relative_path = normalize_relative(relative);
        if relative_path.as_os_str().is_empty() {
            return None;
        }
        Some(Self {
            absolute_path,
            relative_path,
        })
    }

    /// 由根目录和相对路径直接创建任务（不访问文件系统）
    pub fn from_relative(root: impl AsRef<Path>, relative: impl AsRef<Path>) -> Self {
        let relative_path = normalize_relative(relative.as_ref());
        Self {
            absolute_path: root.as_ref().join(&relative_path),
            relative_path,
        }
    }

    pub fn absolute_path(&self) -> &Path {
        &self.absolute_path
    }

    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    /// 以 `/` 开头、`/` 分隔的页面 URI，例如 `/admin/index.jsp`
    pub fn uri(&self) -> String {
        let segments: Vec<String> = self
            .relative_path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// 生成的 Servlet 全限定类名
    ///
    /// 目录名和文件名都会被转换成合法的 Java 标识符，
    /// 例如 `admin/index.jsp` → `org.apache.jsp.admin.index_jsp`
    pub fn servlet_class(&self, package: &str) -> String {
        let mut parts: Vec<String> = Vec::new();
        if !package.is_empty() {
            parts.push(package.to_string());
        }
        for component in self.relative_path.components() {
            parts.push(make_java_identifier(&component.as_os_str().to_string_lossy()));
        }
        parts.join(".")
    }
}

impl Display for CompilationJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}

/// 去掉开头的 `./` 等当前目录分量
pub fn normalize_relative(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir | Component::RootDir))
        .collect()
}

/// 把任意字符串转换为合法的 Java 标识符
pub fn make_java_identifier(name: &str) -> String {
    let mut identifier = String::with_capacity(name.len() + 1);
    if name.chars().next().map_or(true, |c| !is_java_identifier_start(c)) {
        identifier.push('_');
    }
    for c in name.chars() {
        if c == '.' {
            identifier.push('_');
        } else if is_java_identifier_part(c) {
            identifier.push(c);
        } else {
            identifier.push_str(&format!("_{:04x}", c as u32));
        }
    }
    if JAVA_KEYWORDS.contains(&identifier.as_str()) {
        identifier.push('_');
    }
    identifier
}

fn is_java_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_java_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
