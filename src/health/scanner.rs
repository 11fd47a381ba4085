//! 并发扫描器模块
//!
//! 固定数量的工作任务从共享队列中取出端点并探测，结果通过通道汇总

use crate::health::endpoint::{Endpoint, EndpointStatus};
use crate::health::prober::Prober;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

/// 单次扫描的配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// 并发工作任务数（至少为1）
    pub concurrency_limit: usize,
    /// 每次探测的超时时间
    pub per_probe_timeout: Duration,
    /// 白名单URL集合
    pub whitelist: HashSet<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 5,
            per_probe_timeout: Duration::from_millis(2000),
            whitelist: HashSet::new(),
        }
    }
}

impl ScanConfig {
    /// 实际启动的工作任务数
    pub fn worker_count(&self) -> usize {
        self.concurrency_limit.max(1)
    }
}

/// 并发扫描器
#[derive(Clone)]
pub struct ConcurrentScanner {
    /// 探测器
    prober: Arc<dyn Prober>,
}

impl ConcurrentScanner {
    /// 创建新的扫描器
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober }
    }

    /// 扫描一组端点
    ///
    /// 返回的结果数量与输入相同，顺序为完成顺序而非输入顺序。
    pub async fn scan(&self, endpoints: Vec<Endpoint>, config: &ScanConfig) -> Vec<Endpoint> {
        let total = endpoints.len();
        if total == 0 {
            return Vec::new();
        }

        let scan_id = Uuid::new_v4();
        let span = tracing::info_span!("scan", %scan_id, total);
        self.run_workers(endpoints, config).instrument(span).await
    }

    async fn run_workers(&self, endpoints: Vec<Endpoint>, config: &ScanConfig) -> Vec<Endpoint> {
        let total = endpoints.len();
        let workers = config.worker_count();
        let started = Instant::now();
        info!("开始扫描，端点数量: {}, 并发数: {}", total, workers);

        let queue = Arc::new(Mutex::new(VecDeque::from(endpoints)));
        let whitelist = Arc::new(config.whitelist.clone());
        let (result_tx, mut result_rx) = mpsc::unbounded_channel();

        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let whitelist = Arc::clone(&whitelist);
            let prober = Arc::clone(&self.prober);
            let result_tx = result_tx.clone();
            let timeout = config.per_probe_timeout;

            let task = async move {
                let mut processed = 0usize;
                loop {
                    // 锁只在出队期间持有
                    let next = queue.lock().await.pop_front();
                    let Some(endpoint) = next else {
                        break;
                    };

                    // 探测器 panic 时仍为该端点产出结果，保证结果数量与输入一致
                    let checked = match AssertUnwindSafe(prober.probe(&endpoint, timeout, &whitelist))
                        .catch_unwind()
                        .await
                    {
                        Ok(checked) => checked,
                        Err(_) => {
                            error!("探测任务异常: {}", endpoint.url);
                            endpoint
                                .with_status(EndpointStatus::Down)
                                .with_error("Probe aborted")
                        }
                    };
                    processed += 1;
                    if result_tx.send(checked).is_err() {
                        break;
                    }
                }
                debug!("工作任务 {} 退出，处理数量: {}", worker_id, processed);
            };
            handles.push(tokio::spawn(task.in_current_span()));
        }
        drop(result_tx);

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                error!("扫描工作任务异常退出: {}", e);
            }
        }

        let mut results = Vec::with_capacity(total);
        while let Some(checked) = result_rx.recv().await {
            results.push(checked);
        }

        let up = results.iter().filter(|e| e.is_up()).count();
        info!(
            "扫描完成，耗时: {}ms, 存活: {}/{}",
            started.elapsed().as_millis(),
            up,
            results.len()
        );
        results
    }
}
