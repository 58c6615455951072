//! Gateway failure scenarios

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use voltrend::gateway::{ApiGateway, BudgetParams, EndpointClass, GatewayError, GatewayParams};

fn gateway_params() -> GatewayParams {
    GatewayParams {
        market_data: BudgetParams {
            capacity: 100.0,
            refill_per_sec: 100.0,
        },
        account: BudgetParams {
            capacity: 100.0,
            refill_per_sec: 100.0,
        },
        max_attempts: 5,
        initial_backoff_ms: 10,
        max_backoff_ms: 50,
        breaker_failure_threshold: 10,
        breaker_cooldown_secs: 30,
    }
}

#[tokio::test(start_paused = true)]
async fn sustained_transient_failures_open_circuit_then_recover() {
    let gateway = Arc::new(ApiGateway::new(gateway_params()));
    let upstream_calls = Arc::new(AtomicU32::new(0));

    // Two exhausted calls produce 10 consecutive transient failures
    for _ in 0..2 {
        let calls = upstream_calls.clone();
        let result: Result<(), _> = gateway
            .call(EndpointClass::MarketData, move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(GatewayError::Upstream(502))
                }
            })
            .await;
        assert!(matches!(result, Err(GatewayError::Exhausted { attempts: 5, .. })));
    }
    assert_eq!(upstream_calls.load(Ordering::SeqCst), 10);
    assert!(gateway.is_circuit_open(EndpointClass::MarketData).await);

    // While the circuit is open, calls fail fast without touching upstream
    for _ in 0..3 {
        let calls = upstream_calls.clone();
        let result: Result<(), _> = gateway
            .call(EndpointClass::MarketData, move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;
        assert!(matches!(result, Err(GatewayError::CircuitOpen { .. })));
    }
    assert_eq!(upstream_calls.load(Ordering::SeqCst), 10);

    // After the cooldown the next call goes through and closes the circuit
    tokio::time::advance(Duration::from_secs(31)).await;
    let calls = upstream_calls.clone();
    let result = gateway
        .call(EndpointClass::MarketData, move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(17)
            }
        })
        .await;
    assert_eq!(result.unwrap(), 17);
    assert!(!gateway.is_circuit_open(EndpointClass::MarketData).await);
}

#[tokio::test(start_paused = true)]
async fn auth_failure_surfaces_without_retry_or_circuit_impact() {
    let gateway = ApiGateway::new(gateway_params());
    let upstream_calls = Arc::new(AtomicU32::new(0));

    let calls = upstream_calls.clone();
    let result: Result<(), _> = gateway
        .call(EndpointClass::Account, move || {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(GatewayError::Auth)
            }
        })
        .await;

    assert!(matches!(result, Err(GatewayError::Auth)));
    assert_eq!(upstream_calls.load(Ordering::SeqCst), 1);
    assert!(!gateway.is_circuit_open(EndpointClass::Account).await);
}
