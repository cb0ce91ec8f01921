//! 编译线程池 - 编排层
//!
//! ## 职责
//!
//! 以固定数量的工作者并发执行编译任务，收集失败但不中断其它任务。
//!
//! ## 核心功能
//!
//! 1. **固定并发**：恰好启动 `thread_count` 个工作者，从共享队列取任务
//! 2. **失败隔离**：单个任务的错误（包括 panic）只记入 `FailureSet`
//! 3. **有限等待**：提交完毕后最多等待 `timeout`，超时直接返回，不强制取消
//!
//! 超时后仍在运行的工作者会在后台继续执行直到结束。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::PoolConfig;
use crate::error::CompileError;
use crate::models::{CompilationJob, FailureSet, JobFailure};
use crate::workflow::PageCompiler;

/// 线程池运行结果
#[derive(Debug)]
pub struct PoolOutcome {
    /// 提交的任务数
    pub submitted: usize,
    /// 等待结束时已开始执行的任务数
    pub attempted: usize,
    /// 是否在超时前全部结束
    pub terminated: bool,
    /// 共享的失败集合
    pub failures: Arc<FailureSet>,
}

/// 编译线程池
///
/// 工作者数量必须恰好等于 `thread_count`，所以用固定工作者 + 共享队列，
/// 而不是每个任务一个 `spawn` 再用信号量限流。
pub struct CompileWorkerPool {
    config: PoolConfig,
}

impl CompileWorkerPool {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }

    /// 执行所有任务并等待（最多 `timeout`）
    ///
    /// 每个任务恰好执行一次；本方法本身不会因为任务失败或超时返回错误
    pub async fn run(
        &self,
        jobs: Vec<CompilationJob>,
        compiler: Arc<dyn PageCompiler>,
    ) -> PoolOutcome {
        let submitted = jobs.len();
        let thread_count = self.config.thread_count();
        info!("📊 使用 {} 个线程编译 {} 个 JSP", thread_count, submitted);

        let queue = Arc::new(Mutex::new(VecDeque::from(jobs)));
        let failures = Arc::new(FailureSet::new());
        let attempted = Arc::new(AtomicUsize::new(0));

        let workers: Vec<_> = (0..thread_count)
            .map(|worker_id| {
                tokio::spawn(worker_loop(
                    worker_id,
                    Arc::clone(&queue),
                    Arc::clone(&compiler),
                    Arc::clone(&failures),
                    Arc::clone(&attempted),
                ))
            })
            .collect();

        // 队列在启动工作者之前已经填满，之后不再接收新任务
        info!("🔒 任务已全部提交，停止接收新任务");
        info!("⏳ 等待编译完成，超时: {:?}", self.config.timeout());

        let terminated = match tokio::time::timeout(self.config.timeout(), join_all(workers)).await
        {
            Ok(results) => {
                for result in results.into_iter().filter_map(Result::err) {
                    error!("工作者异常退出: {}", result);
                }
                true
            }
            Err(_) => false,
        };
        info!("⏳ 等待结束，是否按时完成: {}", terminated);
        if !terminated {
            warn!("⚠️ 编译超时，未完成的任务将在后台继续执行");
        }

        PoolOutcome {
            submitted,
            attempted: attempted.load(Ordering::SeqCst),
            terminated,
            failures,
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<CompilationJob>>>,
    compiler: Arc<dyn PageCompiler>,
    failures: Arc<FailureSet>,
    attempted: Arc<AtomicUsize>,
) {
    while let Some(job) = next_job(&queue) {
        attempted.fetch_add(1, Ordering::SeqCst);
        debug!("[工作者 {}] 开始处理 {}", worker_id, job);

        let task_compiler = Arc::clone(&compiler);
        let task_job = job.clone();
        let result = tokio::task::spawn_blocking(move || task_compiler.compile(&task_job))
            .await
            .unwrap_or_else(|e| Err(CompileError::new(format!("编译任务异常终止: {e}"))));

        if let Err(err) = result {
            error!("[{}] ❌ 编译失败: {}", job, err.chain());
            failures.push(JobFailure::new(job, err));
        }
    }
    debug!("[工作者 {}] 队列已空，退出", worker_id);
}

fn next_job(queue: &Mutex<VecDeque<CompilationJob>>) -> Option<CompilationJob> {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}
