//! 失败集合
//!
//! 所有工作线程共享同一个 `FailureSet`，只追加、不删除。
//! 顺序即完成顺序，每次运行之间并不确定。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::CompileError;
use crate::models::CompilationJob;

/// 一个失败的编译任务
#[derive(Debug, Clone)]
pub struct JobFailure {
    job: CompilationJob,
    error: Arc<CompileError>,
}

impl JobFailure {
    pub fn new(job: CompilationJob, error: CompileError) -> Self {
        Self {
            job,
            error: Arc::new(error),
        }
    }

    pub fn job(&self) -> &CompilationJob {
        &self.job
    }

    pub fn error(&self) -> &Arc<CompileError> {
        &self.error
    }
}

/// 线程安全的失败收集器（只追加）
#[derive(Debug, Default)]
pub struct FailureSet {
    failures: Mutex<Vec<JobFailure>>,
}

impl FailureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个失败
    pub fn push(&self, failure: JobFailure) {
        self.lock().push(failure);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// 当前已记录失败的快照（按记录顺序）
    ///
    /// 超时后仍在运行的任务可能继续追加，快照不会反映之后的变化
    pub fn snapshot(&self) -> Vec<JobFailure> {
        self.lock().clone()
    }

    // 某个工作线程在持锁时 panic 不应让其余失败丢失
    fn lock(&self) -> MutexGuard<'_, Vec<JobFailure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
