mod common;

use common::*;
use keyshop::error::DecisionError;
use keyshop::fulfillment::{AllocationEngine, AllocationError};
use keyshop::model::{Days, Decision, OperatorId, OrderId, OrderStatus, ProductId, RejectReason};
use keyshop::store::{FulfillmentStore, SqliteStore};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_approve_takes_oldest_key_and_writes_sale() {
    let (_dir, store) = temp_store().await;
    stock(&store, "bgmi", 7, &["KEY-A", "KEY-B"]).await;
    let order = store.create_order(order_params(10, "bgmi", 7, 499)).await.unwrap();

    let engine = AllocationEngine::new(Arc::new(store.clone()));
    let allocation = engine.approve(order.id, OPERATOR).await.unwrap();

    assert_eq!(allocation.credential.value, "KEY-A");
    assert_eq!(allocation.order.status, OrderStatus::Approved);
    assert_eq!(allocation.order.credential.as_deref(), Some("KEY-A"));
    assert_eq!(allocation.order.approved_by, Some(OPERATOR));
    assert!(allocation.order.approved_at.is_some());

    assert_eq!(allocation.sale.order_id, order.id);
    assert_eq!(allocation.sale.credential, "KEY-A");
    assert_eq!(allocation.sale.amount, 499);
    assert_eq!(allocation.sale.buyer_name, "Buyer 10");

    let stored = store.get_order(order.id).await.unwrap();
    assert_eq!(stored, allocation.order);

    let key = store.credential_by_value("KEY-A").await.unwrap().unwrap();
    assert!(key.consumed);
    assert_eq!(key.order_id, Some(order.id));
    assert_eq!(store.count_available(&ProductId::new("bgmi"), Days(7)).await.unwrap(), 1);
    assert_eq!(store.sale_for_order(order.id).await.unwrap(), Some(allocation.sale));
}

#[tokio::test]
async fn test_keys_are_handed_out_in_insertion_order() {
    let (_dir, store) = temp_store().await;
    stock(&store, "mars", 30, &["M-1", "M-2", "M-3"]).await;
    let engine = AllocationEngine::new(Arc::new(store.clone()));

    let mut handed_out = Vec::new();
    for buyer in 1..=3 {
        let order = store
            .create_order(order_params(buyer, "mars", 30, 999))
            .await
            .unwrap();
        let allocation = engine.approve(order.id, OPERATOR).await.unwrap();
        handed_out.push(allocation.credential.value);
    }

    assert_eq!(handed_out, vec!["M-1", "M-2", "M-3"]);
}

#[tokio::test]
async fn test_other_plans_are_not_touched() {
    let (_dir, store) = temp_store().await;
    stock(&store, "bgmi", 30, &["BGMI-30"]).await;
    stock(&store, "kill", 7, &["KILL-7"]).await;
    let order = store.create_order(order_params(1, "bgmi", 7, 499)).await.unwrap();

    let result = AllocationEngine::new(Arc::new(store.clone()))
        .approve(order.id, OPERATOR)
        .await;

    assert!(matches!(
        result,
        Err(AllocationError::OutOfStock { ref product, duration: Days(7) }) if product.as_str() == "bgmi"
    ));
    assert_eq!(store.count_available(&ProductId::new("bgmi"), Days(30)).await.unwrap(), 1);
    assert_eq!(store.count_available(&ProductId::new("kill"), Days(7)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_out_of_stock_leaves_order_pending_until_restocked() {
    let (_dir, store) = temp_store().await;
    let order = store.create_order(order_params(1, "bat", 1, 120)).await.unwrap();
    let lifecycle = lifecycle(Arc::new(store.clone())).await;

    let first = lifecycle
        .submit_decision(order.id, Decision::Approve, OPERATOR)
        .await;
    assert!(matches!(first, Err(DecisionError::OutOfStock { .. })));

    let pending = store.get_order(order.id).await.unwrap();
    assert_eq!(pending.status, OrderStatus::Pending);
    assert_eq!(pending.credential, None);
    assert_eq!(store.sale_for_order(order.id).await.unwrap(), None);

    stock(&store, "bat", 1, &["BAT-1"]).await;
    let second = lifecycle
        .submit_decision(order.id, Decision::Approve, OPERATOR)
        .await
        .unwrap();
    assert_eq!(second.status(), OrderStatus::Approved);
    assert_eq!(second.credential(), Some("BAT-1"));
}

#[tokio::test]
async fn test_second_approval_reports_current_status() {
    let (_dir, store) = temp_store().await;
    stock(&store, "bgmi", 7, &["K1", "K2"]).await;
    let order = store.create_order(order_params(1, "bgmi", 7, 499)).await.unwrap();
    let lifecycle = lifecycle(Arc::new(store.clone())).await;

    lifecycle
        .submit_decision(order.id, Decision::Approve, OPERATOR)
        .await
        .unwrap();
    let again = lifecycle
        .submit_decision(order.id, Decision::Approve, OTHER_OPERATOR)
        .await;

    assert!(matches!(
        again,
        Err(DecisionError::AlreadyDecided(OrderStatus::Approved))
    ));
    let order = store.get_order(order.id).await.unwrap();
    assert_eq!(order.credential.as_deref(), Some("K1"));
    assert_eq!(order.approved_by, Some(OPERATOR));
    assert_eq!(store.count_available(&ProductId::new("bgmi"), Days(7)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reject_never_touches_inventory() {
    let (_dir, store) = temp_store().await;
    stock(&store, "kill", 15, &["KILL-15"]).await;
    let order = store.create_order(order_params(5, "kill", 15, 699)).await.unwrap();
    let lifecycle = lifecycle(Arc::new(store.clone())).await;

    let outcome = lifecycle
        .submit_decision(
            order.id,
            Decision::Reject(RejectReason::WrongAmount),
            OPERATOR,
        )
        .await
        .unwrap();

    assert_eq!(outcome.status(), OrderStatus::Rejected);
    assert!(outcome.sale.is_none());
    assert_eq!(outcome.order.credential, None);
    assert_eq!(outcome.order.rejected_by, Some(OPERATOR));
    assert_eq!(outcome.order.reject_reason, Some(RejectReason::WrongAmount));
    assert_eq!(store.count_available(&ProductId::new("kill"), Days(15)).await.unwrap(), 1);

    let approve_after = lifecycle
        .submit_decision(order.id, Decision::Approve, OPERATOR)
        .await;
    assert!(matches!(
        approve_after,
        Err(DecisionError::AlreadyDecided(OrderStatus::Rejected))
    ));
    assert_eq!(store.count_available(&ProductId::new("kill"), Days(15)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_free_text_reason_is_trimmed_and_capped() {
    let (_dir, store) = temp_store().await;
    let order = store.create_order(order_params(5, "kill", 15, 699)).await.unwrap();
    let lifecycle = lifecycle(Arc::new(store.clone())).await;
    let long = format!("  {}  ", "x".repeat(400));

    lifecycle
        .submit_decision(order.id, Decision::Reject(RejectReason::other(&long)), OPERATOR)
        .await
        .unwrap();

    let stored = store.get_order(order.id).await.unwrap();
    assert_eq!(stored.reject_reason, Some(RejectReason::Other("x".repeat(300))));
}

#[tokio::test]
async fn test_unknown_order_and_unknown_operator() {
    let (_dir, store) = temp_store().await;
    let order = store.create_order(order_params(1, "bgmi", 1, 120)).await.unwrap();
    let lifecycle = lifecycle(Arc::new(store.clone())).await;

    let missing = OrderId::new();
    let result = lifecycle
        .submit_decision(missing, Decision::Approve, OPERATOR)
        .await;
    assert!(matches!(result, Err(DecisionError::OrderNotFound(id)) if id == missing));

    let result = lifecycle
        .submit_decision(order.id, Decision::Reject(RejectReason::NoPayment), OperatorId(99))
        .await;
    assert!(matches!(result, Err(DecisionError::Unauthorized(OperatorId(99)))));
    assert_eq!(
        store.get_order(order.id).await.unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn test_create_order_validation() {
    let (_dir, store) = temp_store().await;
    let lifecycle = lifecycle(Arc::new(store.clone())).await;

    let cases = [
        order_params(1, "nope", 7, 499),
        order_params(1, "bgmi", 2, 499),
        order_params(1, "bgmi", 7, 0),
        {
            let mut blank = order_params(1, "bgmi", 7, 499);
            blank.buyer_name = "   ".to_string();
            blank
        },
    ];
    for params in cases {
        let result = lifecycle.create_order(params.clone()).await;
        assert!(
            matches!(result, Err(DecisionError::InvalidOrder(_))),
            "{params:?} should be refused"
        );
    }
    assert!(store.list_recent_orders(10, 0).await.unwrap().is_empty());

    let order = lifecycle
        .create_order(order_params(1, "bgmi", 7, 499))
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.proof.as_deref(), Some("UTR-1"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_approvals_never_share_a_key() {
    let (_dir, store) = temp_store().await;
    stock(&store, "bgmi", 7, &["C-1", "C-2", "C-3"]).await;

    let mut order_ids = Vec::new();
    for buyer in 0..8 {
        let order = store
            .create_order(order_params(buyer, "bgmi", 7, 499))
            .await
            .unwrap();
        order_ids.push(order.id);
    }

    // Each task gets its own store handle over the shared pool.
    let tasks: Vec<_> = order_ids
        .iter()
        .map(|&id| {
            let store: SqliteStore = store.clone();
            tokio::spawn(async move {
                let lifecycle = lifecycle(Arc::new(store)).await;
                lifecycle.submit_decision(id, Decision::Approve, OPERATOR).await
            })
        })
        .collect();

    let mut delivered = Vec::new();
    let mut out_of_stock = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => delivered.push(outcome.credential().unwrap().to_string()),
            Err(DecisionError::OutOfStock { .. }) => out_of_stock += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(delivered.len(), 3);
    assert_eq!(out_of_stock, 5);
    let unique: HashSet<_> = delivered.iter().collect();
    assert_eq!(unique.len(), 3);
    assert_eq!(store.recent_sales(50).await.unwrap().len(), 3);
    assert_eq!(
        store.list_orders_by_status(OrderStatus::Pending, 50, 0).await.unwrap().len(),
        5
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decisions_on_one_order_apply_once() {
    let (_dir, store) = temp_store().await;
    stock(&store, "mars", 1, &["ONLY-1", "ONLY-2", "ONLY-3", "ONLY-4"]).await;
    let order_id = store
        .create_order(order_params(1, "mars", 1, 120))
        .await
        .unwrap()
        .id;
    let lifecycle = Arc::new(lifecycle(Arc::new(store.clone())).await);

    let decisions = [
        Decision::Approve,
        Decision::Approve,
        Decision::Reject(RejectReason::Timeout),
        Decision::Approve,
        Decision::Reject(RejectReason::NoPayment),
        Decision::Approve,
    ];
    let tasks: Vec<_> = decisions
        .into_iter()
        .map(|decision| {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move {
                lifecycle.submit_decision(order_id, decision, OPERATOR).await
            })
        })
        .collect();

    let mut applied = Vec::new();
    let mut already = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(outcome) => applied.push(outcome.status()),
            Err(DecisionError::AlreadyDecided(_)) => already += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(applied.len(), 1);
    assert_eq!(already, 5);

    let order = store.get_order(order_id).await.unwrap();
    assert_eq!(order.status, applied[0]);
    let sales = store.recent_sales(10).await.unwrap();
    let remaining = store.count_available(&ProductId::new("mars"), Days(1)).await.unwrap();
    match order.status {
        OrderStatus::Approved => {
            assert_eq!(sales.len(), 1);
            assert_eq!(remaining, 3);
        }
        OrderStatus::Rejected => {
            assert!(sales.is_empty());
            assert_eq!(remaining, 4);
        }
        OrderStatus::Pending => panic!("order left pending"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_abandoned_decisions_never_wedge_the_store() {
    let (_dir, store) = temp_store().await;
    let values: Vec<String> = (0..40).map(|n| format!("ABANDON-{n}")).collect();
    let refs: Vec<&str> = values.iter().map(String::as_str).collect();
    stock(&store, "bgmi", 3, &refs).await;
    let lifecycle = Arc::new(lifecycle(Arc::new(store.clone())).await);

    // Each create_order is a write that would time out on a leaked lock.
    let mut orders = Vec::new();
    for attempt in 0..40u64 {
        let order_id = store
            .create_order(order_params(attempt as i64 + 1, "bgmi", 3, 299))
            .await
            .unwrap()
            .id;
        orders.push(order_id);

        let decision = if attempt % 2 == 0 {
            Decision::Approve
        } else {
            Decision::Reject(RejectReason::InvalidProof)
        };
        let lifecycle = lifecycle.clone();
        let task = tokio::spawn(async move {
            lifecycle.submit_decision(order_id, decision, OPERATOR).await
        });
        tokio::time::sleep(Duration::from_micros((attempt * 13) % 300)).await;
        task.abort();
    }
    tokio::time::sleep(Duration::from_millis(300)).await;

    let mut approved = 0;
    for id in &orders {
        let order = store.get_order(*id).await.unwrap();
        let sale = store.sale_for_order(*id).await.unwrap();
        match order.status {
            OrderStatus::Approved => {
                approved += 1;
                let value = order.credential.clone().unwrap();
                let credential = store.credential_by_value(&value).await.unwrap().unwrap();
                assert!(credential.consumed);
                assert_eq!(credential.order_id, Some(*id));
                assert_eq!(sale.unwrap().credential, value);
            }
            OrderStatus::Pending | OrderStatus::Rejected => {
                assert_eq!(order.credential, None);
                assert!(sale.is_none());
            }
        }
    }
    let available = store
        .count_available(&ProductId::new("bgmi"), Days(3))
        .await
        .unwrap();
    assert_eq!(available, 40 - approved);
    assert_eq!(store.recent_sales(100).await.unwrap().len() as u64, approved);

    let fresh = store
        .create_order(order_params(99, "bgmi", 3, 299))
        .await
        .unwrap();
    let outcome = lifecycle
        .submit_decision(fresh.id, Decision::Approve, OPERATOR)
        .await
        .unwrap();
    assert!(outcome.credential().is_some());
}
