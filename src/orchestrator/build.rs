//! 构建编排器 - 编排层
//!
//! ## 职责
//!
//! 串起一次完整的预编译：确定根目录 → 收集页面 → 线程池编译 →
//! 汇总失败 → 写出描述文件。
//!
//! ## 状态流转
//!
//! ```text
//! Idle → RootResolving → [Scanning] → PoolRunning → Aggregating → Finalizing → Done
//!   任意非终止状态 ──────────────────────────────────────────────→ Failed
//! ```
//!
//! 只有汇总出的编译失败、配置错误、I/O 错误和外部中断会进入 `Failed`；
//! 线程池超时本身不是错误。

use std::fmt::{self, Display};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error};

use crate::config::{Config, PoolConfig};
use crate::error::{BuildError, BuildResult};
use crate::orchestrator::worker_pool::CompileWorkerPool;
use crate::services::{PageResolver, WebDescriptor};
use crate::utils::logging;
use crate::workflow::PageCompiler;

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    RootResolving,
    Scanning,
    PoolRunning,
    Aggregating,
    Finalizing,
    Done,
    Failed,
}

impl Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Idle => "Idle",
            BuildState::RootResolving => "RootResolving",
            BuildState::Scanning => "Scanning",
            BuildState::PoolRunning => "PoolRunning",
            BuildState::Aggregating => "Aggregating",
            BuildState::Finalizing => "Finalizing",
            BuildState::Done => "Done",
            BuildState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// 成功运行的统计
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// 实际使用的根目录
    pub root: PathBuf,
    /// 提交给线程池的任务数
    pub jobs: usize,
    /// 等待结束时已开始执行的任务数
    pub attempted: usize,
    /// 线程池是否在超时前全部结束
    pub terminated_cleanly: bool,
    pub elapsed: Duration,
}

/// 构建编排器
///
/// 持有配置和两个外部协作者（编译器、描述文件）
pub struct Orchestrator {
    config: Config,
    pool_config: Option<PoolConfig>,
    resolver: PageResolver,
    compiler: Arc<dyn PageCompiler>,
    descriptor: Arc<dyn WebDescriptor>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        compiler: Arc<dyn PageCompiler>,
        descriptor: Arc<dyn WebDescriptor>,
    ) -> Self {
        let resolver = PageResolver::new(config.extensions.iter().cloned());
        Self {
            config,
            pool_config: None,
            resolver,
            compiler,
            descriptor,
        }
    }

    /// 覆盖由 `Config` 推导出的线程池配置
    pub fn with_pool_config(mut self, pool_config: PoolConfig) -> Self {
        self.pool_config = Some(pool_config);
        self
    }

    /// 执行一次完整构建（不会被外部中断）
    pub async fn run(&self) -> BuildResult<BuildSummary> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// 执行一次完整构建，`interrupt` 完成时放弃等待并返回 `Interrupted`
    pub async fn run_until<F>(&self, interrupt: F) -> BuildResult<BuildSummary>
    where
        F: Future<Output = ()>,
    {
        let _release = ReleaseGuard(Arc::clone(&self.compiler));
        let mut state = StateTracker::default();

        let result = self.execute(&mut state, interrupt).await;
        match &result {
            Ok(summary) => {
                state.enter(BuildState::Done);
                logging::print_final_stats(summary.jobs, 0, summary.elapsed);
            }
            Err(err) => {
                state.enter(BuildState::Failed);
                error!("❌ 构建失败: {}", err);
            }
        }
        result
    }

    async fn execute<F>(&self, state: &mut StateTracker, interrupt: F) -> BuildResult<BuildSummary>
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let pool_config = match self.pool_config {
            Some(pool_config) => pool_config,
            None => self.config.pool_config()?,
        };
        debug!("execute() 开始，显式指定 {} 个 JSP", self.config.pages.len());

        state.enter(BuildState::RootResolving);
        let root = self
            .resolver
            .resolve_root(self.config.uri_root.as_deref(), &self.config.pages)?;

        if self.config.pages.is_empty() {
            state.enter(BuildState::Scanning);
        }
        let candidates = self.resolver.candidates(&root, &self.config.pages)?;
        let jobs = self.resolver.resolve_jobs(&root, &candidates);

        self.descriptor.init(&root)?;

        state.enter(BuildState::PoolRunning);
        let pool = CompileWorkerPool::new(pool_config);
        let outcome = tokio::select! {
            outcome = pool.run(jobs, Arc::clone(&self.compiler)) => outcome,
            _ = interrupt => return Err(BuildError::Interrupted),
        };

        state.enter(BuildState::Aggregating);
        let failures = outcome.failures.snapshot();
        if let Some(err) = BuildError::aggregate(&failures) {
            logging::print_final_stats(outcome.submitted, failures.len(), started.elapsed());
            return Err(err);
        }

        state.enter(BuildState::Finalizing);
        self.descriptor.complete(&root)?;
        if self.config.add_web_xml_mappings {
            self.descriptor.merge(&root)?;
        }

        Ok(BuildSummary {
            root,
            jobs: outcome.submitted,
            attempted: outcome.attempted,
            terminated_cleanly: outcome.terminated,
            elapsed: started.elapsed(),
        })
    }
}

/// 记录状态迁移
#[derive(Debug)]
struct StateTracker {
    current: BuildState,
}

impl Default for StateTracker {
    fn default() -> Self {
        Self {
            current: BuildState::Idle,
        }
    }
}

impl StateTracker {
    fn enter(&mut self, next: BuildState) {
        debug!("状态迁移: {} → {}", self.current, next);
        self.current = next;
    }
}

/// 每次运行结束时释放编译器资源，覆盖所有返回路径
struct ReleaseGuard(Arc<dyn PageCompiler>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}
