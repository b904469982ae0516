//! S3: a 429 with `Retry-After` is retried exactly once with the reported delay, reusing the
//! same idempotency key across attempts.

// self
use connect_core::{
	cancel::Cancellation,
	model::{ConnectionId, ProviderId},
	operation::{signer::BearerSigner, NoopRateLimiter, OperationRuntime, ProviderOperationRequest, RetryPolicy, Sleeper, TransportAdapter, TransportFuture, TransportKind, TransportRequest, TransportResponse},
};
use std::{collections::HashMap, pin::Pin, sync::Arc};
use time::Duration;
use url::Url;

struct FlakyOnceAdapter {
	calls: Arc<parking_lot::Mutex<Vec<String>>>,
}
impl TransportAdapter for FlakyOnceAdapter {
	fn execute<'a>(&'a self, request: &'a TransportRequest) -> TransportFuture<'a> {
		let idempotency = request.idempotency.clone().expect("Idempotency key should be set before transport.");
		let mut calls = self.calls.lock();
		let is_first = calls.is_empty();

		calls.push(idempotency);

		Box::pin(async move {
			if is_first {
				let mut headers = HashMap::new();

				headers.insert("Retry-After".to_owned(), "3".to_owned());

				Ok(TransportResponse { status_code: 429, headers, body: Vec::new() })
			} else {
				Ok(TransportResponse { status_code: 200, headers: HashMap::new(), body: b"{}".to_vec() })
			}
		})
	}
}

struct RecordingSleeper {
	delays: Arc<parking_lot::Mutex<Vec<Duration>>>,
}
impl Sleeper for RecordingSleeper {
	fn sleep<'a>(&'a self, duration: Duration, _cancel: &'a Cancellation) -> Pin<Box<dyn std::future::Future<Output = ()> + 'a + Send>> {
		self.delays.lock().push(duration);

		Box::pin(async {})
	}
}

#[tokio::test]
async fn s3_retries_once_after_429_with_retry_after_and_reuses_idempotency_key() {
	let calls = Arc::new(parking_lot::Mutex::new(Vec::new()));
	let delays = Arc::new(parking_lot::Mutex::new(Vec::new()));
	let runtime = OperationRuntime::new(
		FlakyOnceAdapter { calls: calls.clone() },
		RecordingSleeper { delays: delays.clone() },
		Arc::new(NoopRateLimiter),
		Arc::new(BearerSigner),
	);

	let request = ProviderOperationRequest {
		provider_id: ProviderId::new("demo").expect("Provider id fixture."),
		connection_id: ConnectionId::new("conn-1").expect("Connection id fixture."),
		operation: "reports.fetch".into(),
		transport_kind: TransportKind::Http,
		transport_request: TransportRequest::new("GET", Url::parse("https://api.example.com/reports").expect("Url fixture.")),
		retry: RetryPolicy { max_attempts: 2 },
		credential: None,
		bucket_key: None,
	};

	let cancel = Cancellation::new();
	let outcome = runtime.execute_provider_operation(request, &cancel).await.expect("Second attempt should succeed.");

	assert_eq!(outcome.attempts, 2);
	assert!(outcome.retried);
	assert_eq!(outcome.response.status_code, 200);

	let calls = calls.lock();

	assert_eq!(calls.len(), 2);
	assert_eq!(calls[0], calls[1], "The idempotency key must be identical across retries.");

	let delays = delays.lock();

	assert_eq!(*delays, vec![Duration::seconds(3)]);
}
