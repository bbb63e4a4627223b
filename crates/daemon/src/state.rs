// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Composition root: owns one instance of every component (C1-C8) and wires
//! them together the way the spec section 2 diagram describes. `AppState`
//! is the single `Arc` handed to the control-plane listener, the HTTP
//! surface, and every background timer task.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use poppo_config::{ConfigStore, ProjectRegistry};
use poppo_core::{SystemClock, TaskId, WorkerId};
use poppo_engine::{AutoScaler, AutoScalerConfig, LifecycleConfig, LifecycleManager, MetricsCollector, RealWorkerProcess, Scheduler, TaskQueue, WorkerPool};
use tokio_util::sync::CancellationToken;

use crate::convert::{scheduling_kind_from_config, selection_kind_from_config};
use crate::paths::DaemonPaths;
use crate::system::SystemSampler;

pub struct AppState {
    pub paths: DaemonPaths,
    pub clock: SystemClock,
    pub start_time: Instant,
    pub config: Arc<ConfigStore>,
    pub registry: Arc<ProjectRegistry>,
    pub queue: Arc<TaskQueue<SystemClock>>,
    pub scheduler: Arc<Scheduler>,
    pub balancer: Arc<WorkerPool<SystemClock>>,
    pub lifecycle: Arc<LifecycleManager<RealWorkerProcess, SystemClock>>,
    pub metrics: Arc<MetricsCollector>,
    pub autoscaler: Arc<AutoScaler<SystemClock>>,
    pub sampler: Arc<SystemSampler>,
    /// Best-effort `task_id -> worker_id` binding recorded when a worker is
    /// chosen for a dispatched task. The global queue (C4) tracks a task's
    /// own `assigned_worker_id` field but has no setter for it since it does
    /// not own the worker pool; the composition root is the one place that
    /// sees both sides of a dispatch, so it keeps this small side table for
    /// `complete-task`/`fail-task` to release the right worker's load.
    assignments: Mutex<HashMap<TaskId, WorkerId>>,
    shutting_down: AtomicBool,
    /// Cancelled by `begin_shutdown`, so a `Command::Shutdown` received over
    /// the control socket tears the process down the same way a SIGTERM
    /// does, instead of only flipping `shutting_down` and leaving `main`
    /// waiting on a signal that will never come.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(paths: DaemonPaths, config: Arc<ConfigStore>, registry: Arc<ProjectRegistry>, shutdown: CancellationToken) -> Self {
        let clock = SystemClock;
        let doc = config.load();

        let queue = Arc::new(TaskQueue::new(
            clock.clone(),
            poppo_engine::QueueConfig {
                max_queue_size: doc.task_queue.max_queue_size,
                retry_delay_ms: doc.defaults.retry_delay_ms,
                preemption_enabled: doc.task_queue.priority_management.preemption.enabled,
            },
        ));
        let scheduler = Arc::new(Scheduler::new(scheduling_kind_from_config(doc.daemon.scheduling_strategy)));
        let balancer = Arc::new(WorkerPool::new(
            clock.clone(),
            poppo_engine::BalancerConfig::default(),
            selection_kind_from_config(doc.worker_pool.strategy),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(RealWorkerProcess::default(), clock.clone(), LifecycleConfig::default()));
        let metrics = Arc::new(MetricsCollector::new(
            poppo_core::metrics::DEFAULT_HISTORY_SIZE,
            poppo_core::metrics::DEFAULT_AGGREGATION_WINDOW,
        ));
        let autoscaler = Arc::new(AutoScaler::new(
            clock.clone(),
            AutoScalerConfig { min: doc.worker_pool.min_workers, max: doc.worker_pool.max_workers, ..AutoScalerConfig::default() },
            doc.worker_pool.min_workers,
        ));
        let sampler = Arc::new(SystemSampler::default());

        Self {
            paths,
            clock,
            start_time: Instant::now(),
            config,
            registry,
            queue,
            scheduler,
            balancer,
            lifecycle,
            metrics,
            autoscaler,
            sampler,
            assignments: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
            shutdown,
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    pub fn begin_shutdown(&self) {
        self.shutting_down.store(true, Ordering::Release);
        self.shutdown.cancel();
    }

    pub fn bind_assignment(&self, task_id: TaskId, worker_id: WorkerId) {
        self.assignments.lock().insert(task_id, worker_id);
    }

    pub fn take_assignment(&self, task_id: TaskId) -> Option<WorkerId> {
        self.assignments.lock().remove(&task_id)
    }

    pub fn project_has_running_tasks(&self, project_id: poppo_core::ProjectId) -> bool {
        self.queue.tasks_by_project(project_id).iter().any(|t| t.status == poppo_core::TaskStatus::Running)
    }

    pub fn uptime_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}
