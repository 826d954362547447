// ==========================================
// 生产计划排队系统 - 周期任务调度器
// ==========================================
// 任务:
// - 产能台账全量重算 (默认每日)
// - 生产队列刷新 (默认每小时, 只汇报完工候选)
// 运行方式: 独立线程 + current-thread tokio 运行时, 关闭标志 + Notify 唤醒
// ==========================================

use crate::api::QueueApi;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// 最小调度间隔（tokio interval 不接受零间隔）
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

// ==========================================
// PlanningScheduler - 周期任务调度器
// ==========================================
pub struct PlanningScheduler {
    queue_api: Arc<QueueApi>,
    capacity_interval: Duration,
    refresh_interval: Duration,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl PlanningScheduler {
    /// 创建调度器
    ///
    /// # 参数
    /// - queue_api: 队列API（两个周期任务的入口）
    /// - capacity_interval: 台账重算间隔
    /// - refresh_interval: 队列刷新间隔
    ///
    /// 小于 MIN_INTERVAL 的间隔按 MIN_INTERVAL 执行
    pub fn new(
        queue_api: Arc<QueueApi>,
        capacity_interval: Duration,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            queue_api,
            capacity_interval: clamp_interval("capacity", capacity_interval),
            refresh_interval: clamp_interval("refresh", refresh_interval),
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// 实际生效的间隔（台账重算, 队列刷新）
    pub fn intervals(&self) -> (Duration, Duration) {
        (self.capacity_interval, self.refresh_interval)
    }

    /// 在后台线程启动调度循环
    ///
    /// 首个周期立即执行一次两个任务, 之后按各自间隔执行
    pub fn start(&self) -> JoinHandle<()> {
        let queue_api = Arc::clone(&self.queue_api);
        let shutdown = Arc::clone(&self.shutdown);
        let wake = Arc::clone(&self.wake);
        let capacity_interval = self.capacity_interval;
        let refresh_interval = self.refresh_interval;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    error!(error = %e, "调度器运行时创建失败");
                    return;
                }
            };

            rt.block_on(async {
                let mut capacity_timer = tokio::time::interval(capacity_interval);
                let mut refresh_timer = tokio::time::interval(refresh_interval);
                info!(
                    capacity_secs = capacity_interval.as_secs(),
                    refresh_secs = refresh_interval.as_secs(),
                    "计划调度器已启动"
                );

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = capacity_timer.tick() => {
                            match queue_api.recompute_all_active_units() {
                                Ok(units) => info!(units = units.len(), "定时台账重算完成"),
                                Err(e) => error!(error = %e, "定时台账重算失败"),
                            }
                        }
                        _ = refresh_timer.tick() => {
                            match queue_api.refresh_production_queue() {
                                Ok(reports) => {
                                    let candidates: usize = reports
                                        .iter()
                                        .map(|r| r.completion_candidates.len())
                                        .sum();
                                    info!(units = reports.len(), candidates, "定时队列刷新完成");
                                }
                                Err(e) => error!(error = %e, "定时队列刷新失败"),
                            }
                        }
                        _ = wake.notified() => {}
                    }
                }

                info!("计划调度器已停止");
            });
        })
    }

    /// 通知调度器停止（当前任务执行完后退出）
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }
}

fn clamp_interval(task: &str, interval: Duration) -> Duration {
    if interval < MIN_INTERVAL {
        warn!(task, requested_ms = interval.as_millis() as u64, "调度间隔过小，按最小间隔执行");
        MIN_INTERVAL
    } else {
        interval
    }
}
