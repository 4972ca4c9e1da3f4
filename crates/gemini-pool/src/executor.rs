//! One inference attempt for a (key, model) pair
//!
//! Sends the request, classifies the reply and applies the pool side effect
//! (park or kill). The caller only sees what to do next.

use provider::{ErrorClassification, InferenceProvider, Prompt, Reply, RequestShape};
use tracing::{debug, info, warn};

use crate::pool::{KeyId, Pool};
use crate::quota::classify_status;

/// What the scheduler should do after one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Model answered; raw text for the extractor
    Answered(String),
    /// Key was parked (`throttled`) or retired; move to another key
    Rotate { throttled: bool },
    /// Try the next model on the same key
    NextModel,
}

fn record(model: &str, result: &'static str) {
    metrics::counter!(
        "discovery_inference_requests_total",
        "model" => model.to_string(),
        "result" => result
    )
    .increment(1);
}

/// Run one attempt of `model` with `key`.
///
/// The grounded shape is sent first. A 400 on it is retried once with the
/// plain shape; the plain reply is classified like any other.
pub async fn execute(
    pool: &Pool,
    provider: &dyn InferenceProvider,
    key: KeyId,
    model: &str,
    prompt: &Prompt,
) -> Step {
    let Some(secret) = pool.secret(key).await else {
        return Step::NextModel;
    };
    let fingerprint = secret.fingerprint();
    let mut shape = RequestShape::Grounded;

    loop {
        debug!(key = %fingerprint, model, ?shape, "sending inference request");
        let reply = match provider
            .generate(secret.expose(), model, prompt, shape)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(key = %fingerprint, model, error = %e, "inference request failed, trying next model");
                record(model, "error");
                return Step::NextModel;
            }
        };

        let (status, body) = match reply {
            Reply::Text(text) => {
                record(model, "ok");
                return Step::Answered(text);
            }
            Reply::Status { status, body } => (status, body),
        };

        match classify_status(status, &body) {
            ErrorClassification::CapabilityRejected if shape == RequestShape::Grounded => {
                info!(key = %fingerprint, model, "grounded request rejected, retrying plain");
                record(model, "rejected");
                shape = RequestShape::Plain;
            }
            ErrorClassification::CapabilityRejected => {
                record(model, "rejected");
                return Step::NextModel;
            }
            ErrorClassification::Throttled { retry_after } => {
                record(model, "throttled");
                pool.park(key, retry_after).await;
                return Step::Rotate { throttled: true };
            }
            ErrorClassification::DailyExhausted => {
                record(model, "daily_exhausted");
                pool.kill(key).await;
                return Step::Rotate { throttled: false };
            }
            ErrorClassification::Unauthorized => {
                record(model, "unauthorized");
                pool.kill(key).await;
                return Step::Rotate { throttled: false };
            }
            ErrorClassification::ModelUnavailable => {
                debug!(key = %fingerprint, model, "model unavailable for key");
                record(model, "unavailable");
                return Step::NextModel;
            }
            ErrorClassification::Transient => {
                warn!(key = %fingerprint, model, status, "unexpected upstream status, trying next model");
                record(model, "error");
                return Step::NextModel;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::pool::KeyStatus;
    use crate::testing::*;
    use std::sync::Arc;
    use std::time::Duration;

    async fn single_key_pool() -> (Arc<ManualClock>, Pool, KeyId) {
        let clock = Arc::new(ManualClock::new());
        let pool = Pool::new(clock.clone());
        pool.configure(["key-alpha-000001"]).await;
        let key = pool.next_usable().await.unwrap();
        (clock, pool, key)
    }

    #[tokio::test]
    async fn success_returns_answer_text() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, _| text(r#"["shopify"]"#));

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::Answered(r#"["shopify"]"#.into()));

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].key, "key-alpha-000001");
        assert_eq!(calls[0].shape, RequestShape::Grounded);
    }

    #[tokio::test]
    async fn throttle_parks_key_and_rotates() {
        let (clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, _| status(429, &throttle_body(30)));

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::Rotate { throttled: true });
        assert!(matches!(
            pool.status(key).await,
            Some(KeyStatus::Throttled { .. })
        ));

        clock.advance(Duration::from_secs(32));
        assert_eq!(pool.status(key).await, Some(KeyStatus::Available));
    }

    #[tokio::test]
    async fn daily_exhaustion_kills_key() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, _| status(429, DAILY_BODY));

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::Rotate { throttled: false });
        assert_eq!(pool.status(key).await, Some(KeyStatus::Dead));
    }

    #[tokio::test]
    async fn forbidden_kills_key() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, _| status(403, "API key not valid"));

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::Rotate { throttled: false });
        assert!(!pool.has_live().await);
    }

    #[tokio::test]
    async fn not_found_moves_to_next_model_without_pool_change() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, _| status(404, "model not found"));

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::NextModel);
        assert_eq!(pool.status(key).await, Some(KeyStatus::Available));
    }

    #[tokio::test]
    async fn server_and_transport_errors_move_to_next_model() {
        let (_clock, pool, key) = single_key_pool().await;

        let provider = FakeProvider::new(|_, _, _| status(503, "unavailable"));
        assert_eq!(
            execute(&pool, &provider, key, "m1", &prompt()).await,
            Step::NextModel
        );

        let provider = FakeProvider::new(|_, _, _| transport_error());
        assert_eq!(
            execute(&pool, &provider, key, "m1", &prompt()).await,
            Step::NextModel
        );
        assert_eq!(pool.status(key).await, Some(KeyStatus::Available));
    }

    #[tokio::test]
    async fn rejected_grounded_request_retries_plain_once() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, shape| match shape {
            RequestShape::Grounded => status(400, "Search Grounding is not supported"),
            RequestShape::Plain => text(r#"["acme"]"#),
        });

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::Answered(r#"["acme"]"#.into()));

        let shapes: Vec<_> = provider.calls().iter().map(|c| c.shape).collect();
        assert_eq!(shapes, vec![RequestShape::Grounded, RequestShape::Plain]);
    }

    #[tokio::test]
    async fn second_rejection_gives_up_on_pair() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, _| status(400, "bad request"));

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::NextModel);
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn plain_retry_reply_is_classified_normally() {
        let (_clock, pool, key) = single_key_pool().await;
        let provider = FakeProvider::new(|_, _, shape| match shape {
            RequestShape::Grounded => status(400, "tools not supported"),
            RequestShape::Plain => status(429, &throttle_body(5)),
        });

        let step = execute(&pool, &provider, key, "m1", &prompt()).await;
        assert_eq!(step, Step::Rotate { throttled: true });
        assert!(matches!(
            pool.status(key).await,
            Some(KeyStatus::Throttled { .. })
        ));
    }
}
