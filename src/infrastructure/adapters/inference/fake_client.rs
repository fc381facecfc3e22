//! Fake Inference Client - 用于测试的推理客户端
//!
//! 返回脚本化结果，不发起任何网络调用；
//! 附带调用计数与请求捕获，供测试断言探活短路等属性

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::application::ports::{
    AnalysisRequest, AnalysisResponse, InferenceEnginePort, InferenceError,
};

/// Fake Inference Client
pub struct FakeInferenceClient {
    /// None 表示探活成功
    probe_failure: Mutex<Option<InferenceError>>,
    /// 提交脚本
    response: Mutex<Result<AnalysisResponse, InferenceError>>,
    /// 扣住提交的闸门（模拟在途请求）
    gate: Mutex<Option<Arc<Notify>>>,
    /// 模拟推理延迟
    latency: Duration,
    probe_calls: AtomicUsize,
    submit_calls: AtomicUsize,
    /// 最近一次提交的请求
    last_request: Mutex<Option<AnalysisRequest>>,
}

impl FakeInferenceClient {
    /// 以固定的提交脚本创建
    pub fn with_response(response: Result<AnalysisResponse, InferenceError>) -> Self {
        Self {
            probe_failure: Mutex::new(None),
            response: Mutex::new(response),
            gate: Mutex::new(None),
            latency: Duration::ZERO,
            probe_calls: AtomicUsize::new(0),
            submit_calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// 探活必失败的客户端
    pub fn with_probe_failure(err: InferenceError) -> Self {
        let client = Self::with_response(Ok(AnalysisResponse {
            status: "success".to_string(),
            analysis: String::new(),
            image: None,
            confidence: None,
        }));
        *client.lock(&client.probe_failure) = Some(err);
        client
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 替换提交脚本（用于重试场景）
    pub fn set_response(&self, response: Result<AnalysisResponse, InferenceError>) {
        *self.lock(&self.response) = response;
    }

    /// 扣住后续提交，返回放行用的通知句柄
    pub fn hold_submissions(&self) -> Arc<Notify> {
        let release = Arc::new(Notify::new());
        *self.lock(&self.gate) = Some(release.clone());
        release
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<AnalysisRequest> {
        self.lock(&self.last_request).clone()
    }

    fn lock<'a, T>(&self, mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl InferenceEnginePort for FakeInferenceClient {
    async fn probe(&self) -> Result<(), InferenceError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match self.lock(&self.probe_failure).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn submit(&self, request: AnalysisRequest) -> Result<AnalysisResponse, InferenceError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.lock(&self.last_request) = Some(request);

        let gate = self.lock(&self.gate).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        self.lock(&self.response).clone()
    }
}
