//! Verification Orchestrator - 验证编排器
//!
//! 把 (类别, 图像) 变成一次远端推理调用，并以状态机管理生命周期:
//!
//! Idle → Probing → Submitting → Decoding → Settled
//!
//! 每次转换都发布到 watch 通道，展示层订阅即可获得进度，无需轮询。
//! 同一实例任一时刻至多一个在途尝试；所有发布都受代际保护，
//! 取消后迟到的响应不会再更新状态。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::error::OrchestratorError;
use crate::application::ports::{
    AnalysisRequest, AnalysisResponse, InferenceEnginePort, InferenceError,
};
use crate::domain::category::CategoryId;
use crate::domain::image::data_url;
use crate::domain::verification::{
    AttemptId, AttemptPhase, Confidence, FailureKind, VerificationFailure, VerificationOutcome,
    VerificationReport, VerificationRequest, Verdict,
};

/// 服务端成功哨兵；其余话术一律归一化为未通过
const SUCCESS_SENTINEL: &str = "success";

/// 编排器配置
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// 上传图像字节上限
    pub max_image_bytes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024,
        }
    }
}

/// 各尝试间共享的发布端状态
struct Shared {
    outcome_tx: watch::Sender<VerificationOutcome>,
    /// 当前代际；取消与新尝试都会推进，老代际的发布被丢弃
    generation: AtomicU64,
    inner: Mutex<Inner>,
}

struct Inner {
    /// 重试用的已存请求（只有进入网络阶段的尝试会存）
    request: Option<VerificationRequest>,
    /// 在途尝试的任务句柄
    attempt: Option<JoinHandle<()>>,
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 代际一致时发布，否则丢弃
    fn publish(&self, generation: u64, outcome: VerificationOutcome) -> bool {
        let _inner = self.lock_inner();
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.outcome_tx.send_replace(outcome);
        true
    }

    fn settle(
        &self,
        generation: u64,
        attempt_id: AttemptId,
        result: Result<VerificationReport, VerificationFailure>,
    ) {
        if !self.publish(generation, VerificationOutcome::Settled { attempt_id, result }) {
            tracing::debug!(attempt_id = %attempt_id, "Stale attempt result dropped");
        }
    }
}

/// 验证编排器
///
/// 持有在途请求与网络任务句柄的唯一所有者；
/// 展示层只通过 [`subscribe`](Self::subscribe) 与控制面方法交互
pub struct VerificationOrchestrator {
    engine: Arc<dyn InferenceEnginePort>,
    config: OrchestratorConfig,
    shared: Arc<Shared>,
}

impl VerificationOrchestrator {
    pub fn new(engine: Arc<dyn InferenceEnginePort>, config: OrchestratorConfig) -> Self {
        let (outcome_tx, _) = watch::channel(VerificationOutcome::Idle);
        Self {
            engine,
            config,
            shared: Arc::new(Shared {
                outcome_tx,
                generation: AtomicU64::new(0),
                inner: Mutex::new(Inner {
                    request: None,
                    attempt: None,
                }),
            }),
        }
    }

    /// 订阅结果流
    pub fn subscribe(&self) -> watch::Receiver<VerificationOutcome> {
        self.shared.outcome_tx.subscribe()
    }

    /// 当前结果快照
    pub fn outcome(&self) -> VerificationOutcome {
        self.shared.outcome_tx.borrow().clone()
    }

    /// 发起验证
    ///
    /// 在途尝试存在时拒绝（禁止双重提交），取消后方可重新发起；
    /// 超限图像在任何网络调用前定论为 Settled(Failure: Decode)
    pub fn start(&self, request: VerificationRequest) -> Result<AttemptId, OrchestratorError> {
        if self.shared.outcome_tx.borrow().is_pending() {
            return Err(OrchestratorError::AttemptInFlight);
        }

        let size = request.image().len();
        if size > self.config.max_image_bytes {
            let limit = self.config.max_image_bytes;
            self.reject_locally(VerificationFailure::new(
                FailureKind::Decode,
                format!("image size {} exceeds upload limit {} bytes", size, limit),
            ));
            return Err(OrchestratorError::ImageTooLarge { size, limit });
        }

        self.launch(request)
    }

    /// 以展示层入站形状发起验证：类别 + data URL
    ///
    /// 本地转码失败在任何网络调用前定论为 Settled(Failure: Decode)
    pub fn start_from_data_url(
        &self,
        category_id: CategoryId,
        image_data_url: &str,
    ) -> Result<AttemptId, OrchestratorError> {
        if self.shared.outcome_tx.borrow().is_pending() {
            return Err(OrchestratorError::AttemptInFlight);
        }

        match VerificationRequest::from_data_url(category_id, image_data_url) {
            Ok(request) => self.start(request),
            Err(e) => {
                self.reject_locally(VerificationFailure::new(FailureKind::Decode, e.to_string()));
                Err(OrchestratorError::InvalidImage(e))
            }
        }
    }

    /// 失败后重试
    ///
    /// 复用已存请求重新进入 Probing，字节不变；
    /// 仅在 Settled(Failure) 下有效
    pub fn retry(&self) -> Result<AttemptId, OrchestratorError> {
        let request = {
            let inner = self.shared.lock_inner();
            let failed = matches!(
                &*self.shared.outcome_tx.borrow(),
                VerificationOutcome::Settled { result: Err(_), .. }
            );
            if !failed {
                return Err(OrchestratorError::InvalidState(
                    "retry is only valid after a failed attempt",
                ));
            }
            inner
                .request
                .clone()
                .ok_or(OrchestratorError::InvalidState("no stored request to retry"))?
        };

        tracing::info!(category = %request.category_id(), "Retrying verification with stored request");
        self.launch(request)
    }

    /// 取消在途尝试
    ///
    /// 中止底层传输操作并回到 Idle，不发布任何终态；
    /// 迟到的响应因代际失配被丢弃
    pub fn cancel(&self) {
        let mut inner = self.shared.lock_inner();
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = inner.attempt.take() {
            handle.abort();
        }
        inner.request = None;
        self.shared.outcome_tx.send_replace(VerificationOutcome::Idle);
        tracing::debug!("Verification attempt cancelled");
    }

    /// 启动一次尝试：发布 Probing 并派生网络任务
    fn launch(&self, request: VerificationRequest) -> Result<AttemptId, OrchestratorError> {
        let attempt_id = AttemptId::new();
        let category = request.category_id();

        let mut inner = self.shared.lock_inner();
        if self.shared.outcome_tx.borrow().is_pending() {
            return Err(OrchestratorError::AttemptInFlight);
        }

        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        inner.request = Some(request.clone());
        self.shared.outcome_tx.send_replace(VerificationOutcome::Pending {
            attempt_id,
            phase: AttemptPhase::Probing,
        });

        let engine = Arc::clone(&self.engine);
        let shared = Arc::clone(&self.shared);
        inner.attempt = Some(tokio::spawn(async move {
            run_attempt(engine, shared, generation, attempt_id, request).await;
        }));
        drop(inner);

        tracing::info!(attempt_id = %attempt_id, category = %category, "Verification attempt started");
        Ok(attempt_id)
    }

    /// 未发起网络调用的本地拒绝
    fn reject_locally(&self, failure: VerificationFailure) {
        let attempt_id = AttemptId::new();
        let mut inner = self.shared.lock_inner();
        // 不覆盖在途尝试的状态
        if self.shared.outcome_tx.borrow().is_pending() {
            return;
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        inner.request = None;
        tracing::warn!(
            attempt_id = %attempt_id,
            kind = failure.kind.as_str(),
            "Verification rejected before any network call"
        );
        self.shared.outcome_tx.send_replace(VerificationOutcome::Settled {
            attempt_id,
            result: Err(failure),
        });
    }
}

/// 单次尝试的完整生命周期
///
/// 副作用只发生在 Probing/Submitting 两个阶段；
/// 每个 await 之后的发布都经过代际校验
async fn run_attempt(
    engine: Arc<dyn InferenceEnginePort>,
    shared: Arc<Shared>,
    generation: u64,
    attempt_id: AttemptId,
    request: VerificationRequest,
) {
    // 路由解析是纯函数，先于任何网络调用
    let route = request.category_id().route();
    tracing::debug!(
        attempt_id = %attempt_id,
        category = %request.category_id(),
        route = %route,
        image_bytes = request.image().len(),
        "Probing inference service"
    );

    if let Err(e) = engine.probe().await {
        tracing::warn!(attempt_id = %attempt_id, error = %e, "Reachability probe failed");
        shared.settle(
            generation,
            attempt_id,
            Err(VerificationFailure::new(
                FailureKind::Unreachable,
                format!("Inference service unreachable: {}", e),
            )),
        );
        return;
    }

    if !shared.publish(
        generation,
        VerificationOutcome::Pending {
            attempt_id,
            phase: AttemptPhase::Submitting,
        },
    ) {
        return;
    }

    let analysis = AnalysisRequest {
        route,
        image: request.image().clone(),
    };
    let response = match engine.submit(analysis).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(attempt_id = %attempt_id, error = %e, "Image submission failed");
            shared.settle(generation, attempt_id, Err(failure_from_submit(e)));
            return;
        }
    };

    if !shared.publish(
        generation,
        VerificationOutcome::Pending {
            attempt_id,
            phase: AttemptPhase::Decoding,
        },
    ) {
        return;
    }

    let result = normalize_response(response);
    if let Ok(report) = &result {
        tracing::info!(
            attempt_id = %attempt_id,
            verdict = report.verdict.as_str(),
            confidence = report.confidence.value(),
            has_result_image = report.result_image.is_some(),
            "Verification settled"
        );
    }
    shared.settle(generation, attempt_id, result);
}

/// 提交阶段错误到失败分类的映射
fn failure_from_submit(err: InferenceError) -> VerificationFailure {
    let message = err.to_string();
    let kind = match err {
        InferenceError::Unreachable(_) => FailureKind::Unreachable,
        InferenceError::Timeout => FailureKind::Timeout,
        InferenceError::Rejected { status } => FailureKind::RequestFailed { status },
        InferenceError::InvalidRequest(_) => FailureKind::Decode,
        InferenceError::InvalidResponse(_) => FailureKind::MalformedResponse,
    };
    VerificationFailure::new(kind, message)
}

/// Decoding 阶段：归一化 wire 响应
///
/// 服务端话术不出应用层；内嵌图像解码失败降级为
/// MalformedResponse，不会中断状态机
fn normalize_response(
    response: AnalysisResponse,
) -> Result<VerificationReport, VerificationFailure> {
    let verdict = if response.status == SUCCESS_SENTINEL {
        Verdict::Passed
    } else {
        Verdict::Failed
    };

    let confidence = match response.confidence {
        Some(value) => Confidence::new(value).map_err(|_| {
            VerificationFailure::new(
                FailureKind::MalformedResponse,
                format!("confidence out of range: {}", value),
            )
        })?,
        None => verdict.default_confidence(),
    };

    let result_image = match response.image.as_deref() {
        Some(encoded) => Some(data_url::decode(encoded).map_err(|e| {
            VerificationFailure::new(
                FailureKind::MalformedResponse,
                format!("embedded result image is not decodable: {}", e),
            )
        })?),
        None => None,
    };

    Ok(VerificationReport {
        verdict,
        confidence,
        analysis: response.analysis,
        result_image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::domain::image::ImageData;
    use crate::infrastructure::adapters::inference::FakeInferenceClient;

    fn request() -> VerificationRequest {
        VerificationRequest::new(
            CategoryId::FasteningIntegrity,
            ImageData::new("image/png", vec![1, 2, 3, 4]),
        )
    }

    fn success_response(image: Option<String>) -> AnalysisResponse {
        AnalysisResponse {
            status: "success".to_string(),
            analysis: "ok".to_string(),
            image,
            confidence: None,
        }
    }

    /// 等待指定尝试定论
    async fn settled_outcome(
        rx: &mut watch::Receiver<VerificationOutcome>,
        attempt_id: AttemptId,
    ) -> VerificationOutcome {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                let outcome = rx.borrow_and_update().clone();
                if let VerificationOutcome::Settled { attempt_id: id, .. } = &outcome {
                    if *id == attempt_id {
                        return outcome;
                    }
                }
                rx.changed().await.expect("orchestrator dropped");
            }
        })
        .await
        .expect("timed out waiting for settled outcome")
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("timed out waiting for condition");
    }

    #[tokio::test]
    async fn test_success_path_settles_with_decoded_image() {
        let annotated = ImageData::new("image/png", vec![9, 9, 9]);
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            Some(data_url::encode(&annotated)),
        ))));
        let orchestrator =
            VerificationOrchestrator::new(fake.clone(), OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let attempt_id = orchestrator.start(request()).unwrap();
        let outcome = settled_outcome(&mut rx, attempt_id).await;

        let report = outcome.report().expect("expected success report");
        assert_eq!(report.verdict, Verdict::Passed);
        assert_eq!(report.confidence, Confidence::FULL);
        assert_eq!(report.analysis, "ok");
        assert_eq!(report.result_image.as_ref(), Some(&annotated));
        assert_eq!(fake.probe_calls(), 1);
        assert_eq!(fake.submit_calls(), 1);
    }

    #[tokio::test]
    async fn test_non_success_token_normalizes_to_failed_verdict() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(AnalysisResponse {
            status: "defect_found".to_string(),
            analysis: "loose bolt on the left flange".to_string(),
            image: None,
            confidence: None,
        })));
        let orchestrator = VerificationOrchestrator::new(fake, OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let attempt_id = orchestrator.start(request()).unwrap();
        let outcome = settled_outcome(&mut rx, attempt_id).await;

        let report = outcome.report().expect("expected report");
        assert_eq!(report.verdict, Verdict::Failed);
        assert_eq!(report.confidence, Confidence::ZERO);
    }

    #[tokio::test]
    async fn test_probe_failure_short_circuits_submission() {
        let fake = Arc::new(FakeInferenceClient::with_probe_failure(
            InferenceError::Unreachable("connection refused".to_string()),
        ));
        let orchestrator =
            VerificationOrchestrator::new(fake.clone(), OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let attempt_id = orchestrator.start(request()).unwrap();
        let outcome = settled_outcome(&mut rx, attempt_id).await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(failure.kind, FailureKind::Unreachable);
        assert_eq!(fake.probe_calls(), 1);
        // 探活失败后绝不发起提交
        assert_eq!(fake.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_rejected_submission_carries_status_code() {
        let fake = Arc::new(FakeInferenceClient::with_response(Err(
            InferenceError::Rejected { status: 503 },
        )));
        let orchestrator = VerificationOrchestrator::new(fake, OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let attempt_id = orchestrator.start(request()).unwrap();
        let outcome = settled_outcome(&mut rx, attempt_id).await;

        let failure = outcome.failure().expect("expected failure");
        assert_eq!(failure.kind, FailureKind::RequestFailed { status: 503 });
    }

    #[tokio::test]
    async fn test_submission_timeout_maps_to_timeout_kind() {
        let fake = Arc::new(FakeInferenceClient::with_response(Err(
            InferenceError::Timeout,
        )));
        let orchestrator = VerificationOrchestrator::new(fake, OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let attempt_id = orchestrator.start(request()).unwrap();
        let outcome = settled_outcome(&mut rx, attempt_id).await;

        assert_eq!(
            outcome.failure().map(|f| f.kind),
            Some(FailureKind::Timeout)
        );
    }

    #[tokio::test]
    async fn test_undecodable_embedded_image_settles_as_malformed_response() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            Some("not-valid-encoding".to_string()),
        ))));
        let orchestrator = VerificationOrchestrator::new(fake, OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let attempt_id = orchestrator.start(request()).unwrap();
        let outcome = settled_outcome(&mut rx, attempt_id).await;

        assert_eq!(
            outcome.failure().map(|f| f.kind),
            Some(FailureKind::MalformedResponse)
        );
    }

    #[tokio::test]
    async fn test_cancel_while_submitting_returns_to_idle() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            None,
        ))));
        let release = fake.hold_submissions();
        let orchestrator =
            VerificationOrchestrator::new(fake.clone(), OrchestratorConfig::default());

        orchestrator.start(request()).unwrap();
        let fake_for_wait = fake.clone();
        wait_until(move || fake_for_wait.submit_calls() == 1).await;

        orchestrator.cancel();
        assert_eq!(orchestrator.outcome(), VerificationOutcome::Idle);

        // 放行被扣住的提交：迟到的响应不得再更新状态
        release.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(orchestrator.outcome(), VerificationOutcome::Idle);
    }

    #[tokio::test]
    async fn test_stale_generation_publish_is_dropped() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            None,
        ))));
        let orchestrator = VerificationOrchestrator::new(fake, OrchestratorConfig::default());

        let stale = orchestrator.shared.generation.load(Ordering::SeqCst);
        orchestrator.cancel();

        let delivered = orchestrator.shared.publish(
            stale,
            VerificationOutcome::Pending {
                attempt_id: AttemptId::new(),
                phase: AttemptPhase::Submitting,
            },
        );
        assert!(!delivered);
        assert_eq!(orchestrator.outcome(), VerificationOutcome::Idle);
    }

    #[tokio::test]
    async fn test_double_start_is_rejected() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            None,
        ))));
        let release = fake.hold_submissions();
        let orchestrator =
            VerificationOrchestrator::new(fake.clone(), OrchestratorConfig::default());

        orchestrator.start(request()).unwrap();
        assert!(matches!(
            orchestrator.start(request()),
            Err(OrchestratorError::AttemptInFlight)
        ));

        orchestrator.cancel();
        release.notify_one();
    }

    #[tokio::test]
    async fn test_retry_reissues_stored_request() {
        let fake = Arc::new(FakeInferenceClient::with_response(Err(
            InferenceError::Rejected { status: 500 },
        )));
        let orchestrator =
            VerificationOrchestrator::new(fake.clone(), OrchestratorConfig::default());
        let mut rx = orchestrator.subscribe();

        let original = request();
        let first = orchestrator.start(original.clone()).unwrap();
        let outcome = settled_outcome(&mut rx, first).await;
        assert!(outcome.failure().is_some());

        fake.set_response(Ok(success_response(None)));
        let second = orchestrator.retry().unwrap();
        let outcome = settled_outcome(&mut rx, second).await;

        assert!(outcome.report().is_some());
        assert_eq!(fake.probe_calls(), 2);
        assert_eq!(fake.submit_calls(), 2);
        // 重试携带原始请求字节，无需重新选图
        let resubmitted = fake.last_request().expect("expected captured request");
        assert_eq!(resubmitted.image.bytes(), original.image().bytes());
        assert_eq!(resubmitted.route, original.category_id().route());
    }

    #[tokio::test]
    async fn test_retry_without_failure_is_invalid() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            None,
        ))));
        let orchestrator = VerificationOrchestrator::new(fake, OrchestratorConfig::default());

        assert!(matches!(
            orchestrator.retry(),
            Err(OrchestratorError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_data_url_rejected_before_network() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            None,
        ))));
        let orchestrator =
            VerificationOrchestrator::new(fake.clone(), OrchestratorConfig::default());

        let result = orchestrator
            .start_from_data_url(CategoryId::ComponentIntegrity, "not a data url");
        assert!(matches!(result, Err(OrchestratorError::InvalidImage(_))));

        let outcome = orchestrator.outcome();
        assert_eq!(outcome.failure().map(|f| f.kind), Some(FailureKind::Decode));
        assert_eq!(fake.probe_calls(), 0);
        assert_eq!(fake.submit_calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_image_rejected_before_network() {
        let fake = Arc::new(FakeInferenceClient::with_response(Ok(success_response(
            None,
        ))));
        let orchestrator = VerificationOrchestrator::new(
            fake.clone(),
            OrchestratorConfig { max_image_bytes: 2 },
        );

        let result = orchestrator.start(request());
        assert!(matches!(
            result,
            Err(OrchestratorError::ImageTooLarge { size: 4, limit: 2 })
        ));
        assert_eq!(
            orchestrator.outcome().failure().map(|f| f.kind),
            Some(FailureKind::Decode)
        );
        assert_eq!(fake.probe_calls(), 0);
    }

    #[test]
    fn test_normalize_rejects_out_of_range_confidence() {
        let response = AnalysisResponse {
            status: "success".to_string(),
            analysis: String::new(),
            image: None,
            confidence: Some(150),
        };
        let failure = normalize_response(response).unwrap_err();
        assert_eq!(failure.kind, FailureKind::MalformedResponse);
    }

    #[test]
    fn test_normalize_keeps_wire_confidence() {
        let response = AnalysisResponse {
            status: "success".to_string(),
            analysis: "minor wear".to_string(),
            image: None,
            confidence: Some(87),
        };
        let report = normalize_response(response).unwrap();
        assert_eq!(report.confidence.value(), 87);
    }
}
