use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::models::JobFailure;

/// 配置错误
///
/// 在任何编译任务开始之前抛出，不重试
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// 既没有指定 uri_root，也没有指定任何 JSP
    #[error("missing target: no uri root and no pages were specified")]
    MissingTarget,
    /// 用于推断根目录的第一个 JSP 不存在
    #[error("file does not exist: {}", .path.display())]
    FileDoesNotExist { path: PathBuf },
    /// 无法确定 Web 应用根目录
    #[error("unable to determine the web application root")]
    NoUriRoot,
    /// 根目录不是目录
    #[error("uri root is not a directory: {}", .path.display())]
    UriRootNotDir { path: PathBuf },
    /// 线程数必须大于 0
    #[error("thread count must be greater than zero (got {0})")]
    InvalidThreadCount(usize),
    /// 超时时间必须大于 0
    #[error("compilation timeout must be greater than zero")]
    InvalidTimeout,
    /// 没有配置外部编译命令
    #[error("no compiler command configured")]
    MissingCompilerCommand,
    /// 读取配置文件失败
    #[error("failed to read config file {}: {source}", .path.display())]
    ConfigFileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// 解析配置文件失败
    #[error("failed to parse config file {}: {source}", .path.display())]
    ConfigFileParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// 单个 JSP 的编译错误
///
/// 可以包装另一个错误作为原因，形成一条原因链；
/// 汇总时只取链条最底层的那条消息。
#[derive(Debug)]
pub struct CompileError {
    message: String,
    cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl CompileError {
    /// 创建不带原因的编译错误
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            cause: None,
        }
    }

    /// 创建包装了另一个错误的编译错误
    pub fn with_cause(
        message: impl Into<String>,
        cause: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            cause: Some(Box::new(cause)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// 沿着 `source()` 一直走到底，返回最底层的错误
    pub fn root_cause(&self) -> &(dyn std::error::Error + 'static) {
        let mut current: &(dyn std::error::Error + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    /// 完整的原因链，用 ": " 连接（用于日志）
    pub fn chain(&self) -> String {
        let mut parts = vec![self.message.clone()];
        let mut current = std::error::Error::source(self);
        while let Some(err) = current {
            parts.push(err.to_string());
            current = err.source();
        }
        parts.join(": ")
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|source| source.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// 描述文件收尾阶段（complete / merge）的错误
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// 构建级错误：一次完整运行对外暴露的唯一错误类型
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// 至少一个 JSP 编译失败。
    ///
    /// `message` 按失败顺序逐行列出每个失败的根本原因，
    /// `cause` 是第一个记录到的失败。
    #[error("{message}")]
    Compilation {
        message: String,
        failures: usize,
        #[source]
        cause: Arc<CompileError>,
    },
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// 等待编译结果时被外部中断
    #[error("interrupted while awaiting compilation")]
    Interrupted,
}

impl BuildError {
    /// 汇总所有失败；没有失败时返回 `None`
    pub fn aggregate(failures: &[JobFailure]) -> Option<Self> {
        let first = failures.first()?;
        let mut message = String::new();
        for failure in failures {
            message.push_str(&failure.error().root_cause().to_string());
            message.push('\n');
        }
        Some(BuildError::Compilation {
            message,
            failures: failures.len(),
            cause: Arc::clone(first.error()),
        })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, BuildError::Configuration(_))
    }
}

impl From<FinalizeError> for BuildError {
    fn from(err: FinalizeError) -> Self {
        match err {
            FinalizeError::Io(e) => BuildError::Io(e),
            FinalizeError::Compile(e) => {
                let message = format!("{}\n", e.root_cause());
                BuildError::Compilation {
                    message,
                    failures: 1,
                    cause: Arc::new(e),
                }
            }
        }
    }
}

/// 构建结果类型
pub type BuildResult<T> = Result<T, BuildError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CompilationJob;
    use std::error::Error as _;

    #[test]
    fn root_cause_follows_the_whole_chain() {
        let inner = CompileError::new("unterminated tag");
        let middle = CompileError::with_cause("parse failed", inner);
        let outer = CompileError::with_cause("compiling /a.jsp failed", middle);

        assert_eq!(outer.root_cause().to_string(), "unterminated tag");
        assert_eq!(
            outer.chain(),
            "compiling /a.jsp failed: parse failed: unterminated tag"
        );
    }

    #[test]
    fn root_cause_of_plain_error_is_itself() {
        let err = CompileError::new("syntax error");
        assert_eq!(err.root_cause().to_string(), "syntax error");
        assert!(err.source().is_none());
    }

    #[test]
    fn aggregate_keeps_order_and_first_cause() {
        let failures = vec![
            JobFailure::new(
                CompilationJob::from_relative("/app", "a.jsp"),
                CompileError::with_cause("a failed", CompileError::new("first")),
            ),
            JobFailure::new(
                CompilationJob::from_relative("/app", "b.jsp"),
                CompileError::new("second"),
            ),
        ];

        let err = BuildError::aggregate(&failures).expect("应该有汇总错误");
        assert_eq!(err.to_string(), "first\nsecond\n");
        let cause = err.source().expect("应该有 cause");
        assert_eq!(cause.to_string(), "a failed");
        assert!(BuildError::aggregate(&[]).is_none());
    }

    #[test]
    fn finalize_compile_error_becomes_single_failure() {
        let err: BuildError = FinalizeError::from(CompileError::with_cause(
            "merge failed",
            CompileError::new("bad descriptor"),
        ))
        .into();
        match err {
            BuildError::Compilation {
                message, failures, ..
            } => {
                assert_eq!(message, "bad descriptor\n");
                assert_eq!(failures, 1);
            }
            other => panic!("意外的错误类型: {other:?}"),
        }
    }
}
