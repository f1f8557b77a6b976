//! 基于 tokio 的任务调度器

use di_abstractions::{TaskDescriptor, TaskJob, TaskScheduler};
use infrastructure_common::{DependencyError, DependencyResult};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 已登记的定时任务
#[derive(Clone)]
pub struct ScheduledTask {
    /// 任务ID
    pub id: Uuid,
    /// 任务描述
    pub descriptor: TaskDescriptor,
    job: TaskJob,
}

impl ScheduledTask {
    /// 执行一次
    pub fn run(&self) -> DependencyResult<()> {
        (self.job)()
    }
}

impl std::fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// tokio 任务调度器
///
/// 装配期间登记任务，[`TokioTaskScheduler::start`] 之后按初始延迟与周期执行。
/// 每次执行在阻塞线程池中进行，单次执行失败或 panic 只记录日志，不影响后续执行和其他任务。
#[derive(Default)]
pub struct TokioTaskScheduler {
    tasks: Mutex<Vec<ScheduledTask>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TokioTaskScheduler {
    /// 创建调度器
    pub fn new() -> Self {
        Self::default()
    }

    /// 已登记的任务
    pub fn tasks(&self) -> Vec<ScheduledTask> {
        self.tasks.lock().clone()
    }

    /// 已登记的任务数量
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// 是否已启动
    pub fn is_running(&self) -> bool {
        !self.handles.lock().is_empty()
    }

    /// 启动全部任务，必须在 tokio 运行时内调用
    pub fn start(&self) {
        let mut handles = self.handles.lock();
        if !handles.is_empty() {
            debug!("调度器已启动");
            return;
        }

        for task in self.tasks.lock().iter().cloned() {
            handles.push(tokio::spawn(run_periodically(task)));
        }
        info!("调度器已启动: {} 个任务", handles.len());
    }

    /// 停止全部任务
    pub fn stop(&self) {
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in &handles {
            handle.abort();
        }
        info!("调度器已停止: {} 个任务", handles.len());
    }

    /// 每个任务立即执行一次，返回失败的错误
    pub fn run_all_once(&self) -> Vec<DependencyError> {
        self.tasks()
            .iter()
            .filter_map(|task| task.run().err())
            .inspect(|error| warn!("任务执行失败: {}", error))
            .collect()
    }
}

impl TaskScheduler for TokioTaskScheduler {
    fn register_task(&self, task: TaskDescriptor, job: TaskJob) -> DependencyResult<()> {
        if task.spec.period.is_zero() {
            return Err(DependencyError::task_execution(
                &task.method,
                &task.owner,
                "执行周期必须大于零",
            ));
        }

        let id = Uuid::new_v4();
        info!(
            "登记定时任务 {}.{} ({}): 周期 {:?}, 延迟 {:?}",
            task.owner, task.method, id, task.spec.period, task.spec.initial_delay
        );
        self.tasks.lock().push(ScheduledTask {
            id,
            descriptor: task,
            job,
        });
        Ok(())
    }
}

impl Drop for TokioTaskScheduler {
    fn drop(&mut self) {
        for handle in self.handles.get_mut().drain(..) {
            handle.abort();
        }
    }
}

async fn run_periodically(task: ScheduledTask) {
    let spec = task.descriptor.spec;
    let mut ticker = interval_at(Instant::now() + spec.initial_delay, spec.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let job = task.clone();
        let outcome = match tokio::task::spawn_blocking(move || job.run()).await {
            Ok(outcome) => outcome,
            Err(join_error) if join_error.is_panic() => Err(DependencyError::task_execution(
                &task.descriptor.method,
                &task.descriptor.owner,
                "任务执行时发生 panic",
            )),
            Err(_) => return,
        };
        if let Err(error) = outcome {
            warn!("定时任务 {} 执行失败: {}", task.id, error);
        }
    }
}
