//! 单页编译流程 - 流程层
//!
//! 核心职责：定义"编译一个 JSP"这件事
//!
//! 流程顺序：
//! 1. 调用外部单文件编译器
//! 2. 成功 → 记录 Servlet 映射
//! 3. 失败 → 返回带原因链的 `CompileError`（由线程池收集，不向上抛）

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::{CompileError, ConfigurationError};
use crate::infrastructure::CommandRunner;
use crate::models::CompilationJob;
use crate::services::WebXmlFragment;
use crate::utils::logging::truncate_text;

/// 单页编译能力
///
/// 每个任务恰好调用一次 `compile`，可能在多个线程上并发调用；
/// `release` 在每次运行结束时（无论成功失败）调用一次
pub trait PageCompiler: Send + Sync {
    fn compile(&self, job: &CompilationJob) -> Result<(), CompileError>;

    fn release(&self) {}
}

impl<F> PageCompiler for F
where
    F: Fn(&CompilationJob) -> Result<(), CompileError> + Send + Sync,
{
    fn compile(&self, job: &CompilationJob) -> Result<(), CompileError> {
        self(job)
    }
}

/// 调用外部命令的编译器
///
/// - 每个 JSP 启动一次外部进程
/// - 成功后把映射写入共享的 `WebXmlFragment`
/// - 不持有线程，也不关心并发度
pub struct CommandCompiler {
    runner: CommandRunner,
    fragment: Arc<WebXmlFragment>,
    package_name: String,
    output_dir: PathBuf,
}

impl CommandCompiler {
    /// 创建新的命令编译器
    pub fn new(
        runner: CommandRunner,
        fragment: Arc<WebXmlFragment>,
        package_name: impl Into<String>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runner,
            fragment,
            package_name: package_name.into(),
            output_dir: output_dir.into(),
        }
    }

    /// 按配置创建
    pub fn from_config(
        config: &Config,
        fragment: Arc<WebXmlFragment>,
    ) -> Result<Self, ConfigurationError> {
        let runner = CommandRunner::new(&config.compiler_command)?;
        Ok(Self::new(
            runner,
            fragment,
            config.package_name.clone(),
            config.output_dir.clone(),
        ))
    }
}

impl PageCompiler for CommandCompiler {
    fn compile(&self, job: &CompilationJob) -> Result<(), CompileError> {
        let uri = job.uri();
        let class = job.servlet_class(&self.package_name);
        let page = job.absolute_path().to_string_lossy().into_owned();
        let output = self.output_dir.to_string_lossy().into_owned();

        debug!("[{}] 开始编译 → {}", uri, class);

        let result = self
            .runner
            .run(&[
                ("page", page.as_str()),
                ("uri", uri.as_str()),
                ("class", class.as_str()),
                ("package", self.package_name.as_str()),
                ("output", output.as_str()),
            ])
            .map_err(|e| {
                CompileError::with_cause(
                    format!("无法启动编译器 {} ({})", self.runner.program(), uri),
                    e,
                )
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let reason = stderr
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .last()
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} exited with {}", self.runner.program(), result.status));
            debug!("[{}] 编译器输出: {}", uri, truncate_text(&stderr, 200));
            return Err(CompileError::with_cause(
                format!("编译 {} 失败 ({})", uri, result.status),
                CompileError::new(reason),
            ));
        }

        self.fragment.record(class, uri.clone());
        info!("[{}] ✓ 编译成功", uri);
        Ok(())
    }
}
