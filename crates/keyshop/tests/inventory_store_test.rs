mod common;

use common::*;
use keyshop::model::{
    BuyerId, Days, InventoryCount, NewCredential, OrderStatus, Product, ProductId, RemoveOutcome,
};
use keyshop::store::{FulfillmentStore, StoreError};

#[tokio::test]
async fn test_seeded_products() {
    let (_dir, store) = temp_store().await;

    let ids: Vec<_> = store
        .list_products()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id.0)
        .collect();

    assert_eq!(ids, vec!["bat", "bgmi", "kill", "mars"]);
}

#[tokio::test]
async fn test_credential_values_are_unique_across_products() {
    let (_dir, store) = temp_store().await;
    let first = store
        .insert_credential(NewCredential::new("bgmi", 7, "SAME"))
        .await
        .unwrap();
    assert!(!first.consumed);
    assert_eq!(first.order_id, None);

    let duplicate = store
        .insert_credential(NewCredential::new("mars", 30, "SAME"))
        .await;

    assert!(matches!(duplicate, Err(StoreError::DuplicateCredentialValue)));
    assert_eq!(store.count_available(&ProductId::new("mars"), Days(30)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_count_available_is_per_plan() {
    let (_dir, store) = temp_store().await;
    stock(&store, "bgmi", 7, &["A", "B"]).await;
    stock(&store, "bgmi", 30, &["C"]).await;
    stock(&store, "kill", 7, &["D"]).await;

    assert_eq!(store.count_available(&ProductId::new("bgmi"), Days(7)).await.unwrap(), 2);
    assert_eq!(store.count_available(&ProductId::new("bgmi"), Days(30)).await.unwrap(), 1);
    assert_eq!(store.count_available(&ProductId::new("bgmi"), Days(1)).await.unwrap(), 0);

    assert_eq!(
        store.inventory_summary().await.unwrap(),
        vec![
            InventoryCount {
                product: ProductId::new("bgmi"),
                duration: Days(7),
                available: 2
            },
            InventoryCount {
                product: ProductId::new("bgmi"),
                duration: Days(30),
                available: 1
            },
            InventoryCount {
                product: ProductId::new("kill"),
                duration: Days(7),
                available: 1
            },
        ]
    );
}

#[tokio::test]
async fn test_only_unsold_keys_can_be_removed() {
    let (_dir, store) = temp_store().await;
    stock(&store, "bat", 3, &["SOLD", "SPARE"]).await;
    let order = store.create_order(order_params(1, "bat", 3, 299)).await.unwrap();
    let lifecycle = lifecycle(std::sync::Arc::new(store.clone())).await;
    lifecycle
        .submit_decision(order.id, keyshop::model::Decision::Approve, OPERATOR)
        .await
        .unwrap();

    let bat = ProductId::new("bat");
    assert_eq!(
        store.delete_if_available(&bat, Days(3), "SOLD").await.unwrap(),
        RemoveOutcome::NotFoundOrConsumed
    );
    assert_eq!(
        store.delete_if_available(&bat, Days(7), "SPARE").await.unwrap(),
        RemoveOutcome::NotFoundOrConsumed
    );
    assert_eq!(
        store.delete_if_available(&bat, Days(3), "SPARE").await.unwrap(),
        RemoveOutcome::Removed
    );
    assert_eq!(
        store.delete_if_available(&bat, Days(3), "SPARE").await.unwrap(),
        RemoveOutcome::NotFoundOrConsumed
    );
    assert!(store.credential_by_value("SOLD").await.unwrap().unwrap().consumed);
    assert_eq!(store.credential_by_value("SPARE").await.unwrap(), None);
}

#[tokio::test]
async fn test_order_listings_newest_first() {
    let (_dir, store) = temp_store().await;
    let mut created = Vec::new();
    for buyer in 1..=4 {
        created.push(
            store
                .create_order(order_params(buyer, "kill", 1, 120))
                .await
                .unwrap()
                .id,
        );
    }

    let recent: Vec<_> = store
        .list_recent_orders(3, 0)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(recent, vec![created[3], created[2], created[1]]);

    let pending = store
        .list_orders_by_status(OrderStatus::Pending, 10, 0)
        .await
        .unwrap();
    assert_eq!(pending.len(), 4);
    assert!(store
        .list_orders_by_status(OrderStatus::Approved, 10, 0)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_order_listings_page_with_offset() {
    let (_dir, store) = temp_store().await;
    let mut created = Vec::new();
    for buyer in 1..=5 {
        created.push(
            store
                .create_order(order_params(buyer, "mars", 7, 499))
                .await
                .unwrap()
                .id,
        );
    }
    created.reverse();

    let ids = |orders: Vec<keyshop::model::Order>| -> Vec<_> {
        orders.into_iter().map(|o| o.id).collect()
    };
    assert_eq!(ids(store.list_recent_orders(2, 0).await.unwrap()), created[0..2]);
    assert_eq!(ids(store.list_recent_orders(2, 2).await.unwrap()), created[2..4]);
    assert_eq!(ids(store.list_recent_orders(2, 4).await.unwrap()), created[4..5]);
    assert!(store.list_recent_orders(2, 6).await.unwrap().is_empty());

    assert_eq!(
        ids(store
            .list_orders_by_status(OrderStatus::Pending, 3, 3)
            .await
            .unwrap()),
        created[3..5]
    );
}

#[tokio::test]
async fn test_orders_by_buyer_only_lists_their_own() {
    let (_dir, store) = temp_store().await;
    let first = store.create_order(order_params(7, "kill", 1, 120)).await.unwrap();
    store.create_order(order_params(8, "kill", 1, 120)).await.unwrap();
    let second = store.create_order(order_params(7, "bat", 30, 999)).await.unwrap();

    let mine: Vec<_> = store
        .list_orders_by_buyer(BuyerId(7), 10)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.id)
        .collect();
    assert_eq!(mine, vec![second.id, first.id]);

    assert_eq!(store.list_orders_by_buyer(BuyerId(7), 1).await.unwrap().len(), 1);
    assert!(store.list_orders_by_buyer(BuyerId(9), 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upsert_product() {
    let (_dir, store) = temp_store().await;

    store.upsert_product(&Product::new("pubg", "PUBG")).await.unwrap();
    let mut bgmi = Product::new("bgmi", "BGMI India");
    bgmi.active = false;
    store.upsert_product(&bgmi).await.unwrap();

    let products = store.list_products().await.unwrap();
    assert_eq!(products.len(), 5);
    let stored = products.iter().find(|p| p.id.as_str() == "bgmi").unwrap();
    assert_eq!(stored.name, "BGMI India");
    assert!(!stored.active);
}
