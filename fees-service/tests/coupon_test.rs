mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use fees_service::models::{Coupon, DiscountType};
use rust_decimal::Decimal;
use serde_json::json;

async fn validate(app: &TestApp, code: &str, amount: f64) -> (u16, serde_json::Value) {
    let response = app
        .client
        .post(format!("{}/coupons/validate", app.address))
        .json(&json!({ "code": code, "amount": amount }))
        .send()
        .await
        .expect("Failed to execute request");
    let status = response.status().as_u16();
    (status, response.json().await.unwrap_or_default())
}

#[tokio::test]
async fn percentage_coupon_is_applied_case_insensitively() {
    let app = TestApp::spawn().await;
    app.seed_coupon("TERM20", DiscountType::Percentage, 20);

    let (status, body) = validate(&app, "  term20 ", 5000.0).await;

    assert_eq!(status, 200);
    assert_eq!(body["valid"], true);
    assert_eq!(body["discountAmount"], 1000.0);
    assert_eq!(body["coupon"]["code"], "TERM20");
    assert_eq!(body["coupon"]["discountType"], "percentage");
}

#[tokio::test]
async fn fixed_coupon_never_exceeds_amount() {
    let app = TestApp::spawn().await;
    app.seed_coupon("BIGFIX", DiscountType::Fixed, 8000);

    let (_, body) = validate(&app, "BIGFIX", 5000.0).await;

    assert_eq!(body["valid"], true);
    assert_eq!(body["discountAmount"], 5000.0);
}

#[tokio::test]
async fn rejection_messages_follow_check_order() {
    let app = TestApp::spawn().await;
    let yesterday = Utc::now().date_naive() - Duration::days(1);

    app.store.insert_coupon(Coupon {
        id: "c_expired".into(),
        code: "OLD".into(),
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::new(50, 0),
        max_uses: 10,
        used_count: 0,
        expiry_date: Some(yesterday),
        is_active: true,
        redeemed_references: Vec::new(),
    });
    app.store.insert_coupon(Coupon {
        id: "c_used".into(),
        code: "USEDUP".into(),
        discount_type: DiscountType::Fixed,
        discount_value: Decimal::new(100, 0),
        max_uses: 3,
        used_count: 3,
        expiry_date: None,
        is_active: true,
        redeemed_references: Vec::new(),
    });
    app.store.insert_coupon(Coupon {
        id: "c_off".into(),
        code: "OFF".into(),
        discount_type: DiscountType::Free,
        discount_value: Decimal::ZERO,
        max_uses: 3,
        used_count: 3,
        expiry_date: Some(yesterday),
        is_active: false,
        redeemed_references: Vec::new(),
    });

    let (_, body) = validate(&app, "NOPE", 100.0).await;
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Invalid coupon code.");
    assert!(body.get("discountAmount").is_none());

    let (_, body) = validate(&app, "OFF", 100.0).await;
    assert_eq!(body["message"], "This coupon is inactive.");

    let (_, body) = validate(&app, "USEDUP", 100.0).await;
    assert_eq!(body["message"], "This coupon has reached its maximum usage limit.");

    let (_, body) = validate(&app, "OLD", 100.0).await;
    assert_eq!(body["message"], "This coupon has expired.");
}

#[tokio::test]
async fn validation_does_not_consume_uses() {
    let app = TestApp::spawn().await;
    app.seed_coupon("TERM20", DiscountType::Percentage, 20);

    for _ in 0..5 {
        validate(&app, "TERM20", 100.0).await;
    }

    assert_eq!(app.store.coupon("TERM20").unwrap().used_count, 0);
}

#[tokio::test]
async fn negative_amount_is_rejected() {
    let app = TestApp::spawn().await;

    let (status, _) = validate(&app, "TERM20", -1.0).await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn huge_amount_gets_a_bounded_discount() {
    let app = TestApp::spawn().await;
    app.seed_coupon("TERM20", DiscountType::Percentage, 20);

    let response = app
        .client
        .post(format!("{}/coupons/validate", app.address))
        .header("content-type", "application/json")
        .body(r#"{"code":"TERM20","amount":7922816251426433759354395033}"#)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["valid"], true);
    let discount = body["discountAmount"].as_f64().unwrap();
    assert!(discount > 0.0 && discount <= 7.93e27, "discount {}", discount);

    let (status, body) = validate(&app, "TERM20", 100.0).await;
    assert_eq!(status, 200);
    assert_eq!(body["discountAmount"], 20.0);
}
