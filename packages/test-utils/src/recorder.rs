//! Call recording and stubbing shared by the service mocks
//!
//! A [`CallRecorder`] logs every call a mock receives and answers from
//! per-method stubs. Responses are consumed in this order: one-shot stubs
//! (FIFO), then the sticky stub, then the mock's fallback (usually the
//! return type's `Default`).
//!
//! # Lock Poisoning Recovery
//!
//! Locks are acquired with `unwrap_or_else(|e| e.into_inner())`, so a test
//! that panics while holding the lock does not poison the recorder for the
//! assertions that follow.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use atlas_service_clients::{ClientError, ClientResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// A single recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub method: String,
    pub args: Vec<Value>,
}

impl Call {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

type Response = Result<Value, ClientError>;

#[derive(Debug, Default)]
struct Stub {
    once: VecDeque<Response>,
    sticky: Option<Response>,
}

impl Stub {
    fn next(&mut self) -> Option<Response> {
        self.once.pop_front().or_else(|| self.sticky.clone())
    }
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<Call>,
    stubs: HashMap<String, Stub>,
}

/// Shared call log and stub table
///
/// Clones share the same state, so a mock handed to code under test and
/// the copy kept by the test observe one history.
#[derive(Debug, Clone, Default)]
pub struct CallRecorder {
    state: Arc<Mutex<RecorderState>>,
}

impl CallRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record a call and return the stubbed response, if any
    pub fn record(&self, method: &str, args: Vec<Value>) -> Option<Result<Value, ClientError>> {
        let mut state = self.lock();
        state.calls.push(Call {
            method: method.to_string(),
            args,
        });
        tracing::trace!(method, "recorded mock call");
        state.stubs.get_mut(method).and_then(Stub::next)
    }

    /// Record a call and answer with the stub or `T::default()`
    pub fn respond<T>(&self, method: &str, args: Vec<Value>) -> ClientResult<T>
    where
        T: DeserializeOwned + Default,
    {
        self.respond_or_else(method, args, || Ok(T::default()))
    }

    /// Record a call and answer with the stub or `fallback`
    pub fn respond_or_else<T, F>(&self, method: &str, args: Vec<Value>, fallback: F) -> ClientResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce() -> ClientResult<T>,
    {
        match self.record(method, args) {
            Some(Ok(value)) => serde_json::from_value(value).map_err(|e| {
                ClientError::InvalidResponse(format!("stub for '{}' has the wrong shape: {}", method, e))
            }),
            Some(Err(err)) => Err(err),
            None => fallback(),
        }
    }

    /// Start configuring the responses for `method`
    pub fn when(&self, method: &str) -> StubBuilder<'_> {
        StubBuilder {
            recorder: self,
            method: method.to_string(),
        }
    }

    /// Every call, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.lock().calls.iter().filter(|call| call.method == method).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock().calls.len()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn last_call(&self, method: &str) -> Option<Call> {
        self.lock()
            .calls
            .iter()
            .rev()
            .find(|call| call.method == method)
            .cloned()
    }

    /// Forget recorded calls, keeping stubs
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Forget recorded calls and stubs
    pub fn reset(&self) {
        let mut state = self.lock();
        state.calls.clear();
        state.stubs.clear();
    }

    fn push_once(&self, method: &str, response: Response) {
        self.lock()
            .stubs
            .entry(method.to_string())
            .or_default()
            .once
            .push_back(response);
    }

    fn set_sticky(&self, method: &str, response: Response) {
        self.lock().stubs.entry(method.to_string()).or_default().sticky = Some(response);
    }
}

/// Configures responses for one method
pub struct StubBuilder<'a> {
    recorder: &'a CallRecorder,
    method: String,
}

impl StubBuilder<'_> {
    /// Answer every later call with `value`
    pub fn returns(self, value: impl Serialize) {
        self.recorder.set_sticky(&self.method, encode(value));
    }

    /// Answer the next unanswered call with `value`
    pub fn returns_once(self, value: impl Serialize) -> Self {
        self.recorder.push_once(&self.method, encode(value));
        self
    }

    /// Fail every later call with `err`
    pub fn fails(self, err: ClientError) {
        self.recorder.set_sticky(&self.method, Err(err));
    }

    /// Fail the next unanswered call with `err`
    pub fn fails_once(self, err: ClientError) -> Self {
        self.recorder.push_once(&self.method, Err(err));
        self
    }
}

fn encode(value: impl Serialize) -> Response {
    serde_json::to_value(value).map_err(|e| ClientError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_calls_in_order() {
        let recorder = CallRecorder::new();
        recorder.record("get", vec![json!("a")]);
        recorder.record("set", vec![json!("a"), json!("1")]);
        recorder.record("get", vec![json!("b")]);

        assert_eq!(recorder.total_calls(), 3);
        assert_eq!(recorder.call_count("get"), 2);
        assert_eq!(recorder.last_call("get").unwrap().arg(0), Some(&json!("b")));
        assert_eq!(recorder.calls()[1].method, "set");
        assert!(!recorder.was_called("delete"));
    }

    #[test]
    fn test_unstubbed_call_returns_default() {
        let recorder = CallRecorder::new();
        let value: Vec<String> = recorder.respond("list_models", vec![]).unwrap();
        assert!(value.is_empty());
        assert!(recorder.was_called("list_models"));
    }

    #[test]
    fn test_once_stubs_before_sticky() {
        let recorder = CallRecorder::new();
        recorder.when("generate").returns("sticky");
        recorder.when("generate").returns_once("first").returns_once("second");

        let answers: Vec<String> = (0..4)
            .map(|_| recorder.respond("generate", vec![]).unwrap())
            .collect();
        assert_eq!(answers, vec!["first", "second", "sticky", "sticky"]);
    }

    #[test]
    fn test_failure_stubs() {
        let recorder = CallRecorder::new();
        recorder.when("get").fails_once(ClientError::Timeout(5));

        let first: ClientResult<Option<String>> = recorder.respond("get", vec![]);
        let second: ClientResult<Option<String>> = recorder.respond("get", vec![]);
        assert_eq!(first, Err(ClientError::Timeout(5)));
        assert_eq!(second, Ok(None));
        assert_eq!(recorder.call_count("get"), 2);
    }

    #[test]
    fn test_wrong_shape_stub_is_invalid_response() {
        let recorder = CallRecorder::new();
        recorder.when("exists").returns("definitely");

        let result: ClientResult<bool> = recorder.respond("exists", vec![]);
        assert!(matches!(result, Err(ClientError::InvalidResponse(msg)) if msg.contains("exists")));
    }

    #[test]
    fn test_clones_share_history() {
        let recorder = CallRecorder::new();
        let clone = recorder.clone();
        clone.record("delete", vec![json!("k")]);
        assert!(recorder.was_called("delete"));
    }

    #[test]
    fn test_reset_and_clear() {
        let recorder = CallRecorder::new();
        recorder.when("generate").returns("stubbed");
        recorder.record("generate", vec![]);

        recorder.clear_calls();
        assert_eq!(recorder.total_calls(), 0);
        let kept: String = recorder.respond("generate", vec![]).unwrap();
        assert_eq!(kept, "stubbed");

        recorder.reset();
        let cleared: String = recorder.respond("generate", vec![]).unwrap();
        assert_eq!(cleared, "");
        assert_eq!(recorder.total_calls(), 1);
    }

    #[test]
    fn test_survives_poisoned_lock() {
        let recorder = CallRecorder::new();
        let clone = recorder.clone();
        let _ = std::thread::spawn(move || {
            let _guard = clone.state.lock().unwrap();
            panic!("poison the recorder");
        })
        .join();

        recorder.record("get", vec![]);
        assert_eq!(recorder.call_count("get"), 1);
    }
}
