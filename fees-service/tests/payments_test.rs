mod common;

use common::{charge_success, TestApp};
use fees_service::models::DiscountType;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn initialized(reference: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "status": true,
        "message": "Authorization URL created",
        "data": {
            "authorization_url": format!("https://checkout.paystack.com/{}", reference),
            "access_code": "acc_123",
            "reference": reference
        }
    }))
}

#[tokio::test]
async fn initialize_sends_fee_metadata_to_provider() {
    let app = TestApp::spawn().await;
    app.seed_fee("fee_1", 100);

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(body_partial_json(json!({
            "email": "parent@example.com",
            "amount": 6000,
            "metadata": { "fee_id": "fee_1", "student_id": "stu_1", "discount_applied": false }
        })))
        .respond_with(initialized("ref_init"))
        .expect(1)
        .mount(&app.paystack)
        .await;

    let response = app
        .client
        .post(format!("{}/payments/initialize", app.address))
        .json(&json!({ "fee_id": "fee_1", "email": "parent@example.com", "amount": 60 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["reference"], "ref_init");
    assert_eq!(body["access_code"], "acc_123");
    assert_eq!(body["amount"], 60.0);
    assert_eq!(body["discount_amount"], 0.0);
}

#[tokio::test]
async fn initialize_applies_coupon_discount() {
    let app = TestApp::spawn().await;
    app.seed_fee("fee_1", 100);
    app.seed_coupon("TERM20", DiscountType::Percentage, 20);

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(body_partial_json(json!({
            "amount": 8000,
            "metadata": { "discount_applied": true, "discount_amount": 20.0, "coupon_code": "TERM20" }
        })))
        .respond_with(initialized("ref_disc"))
        .expect(1)
        .mount(&app.paystack)
        .await;

    let response = app
        .client
        .post(format!("{}/payments/initialize", app.address))
        .json(&json!({
            "fee_id": "fee_1",
            "email": "parent@example.com",
            "amount": 100,
            "coupon_code": "term20"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["amount"], 80.0);
    assert_eq!(body["discount_amount"], 20.0);
    // Uses are only counted once the payment completes.
    assert_eq!(app.store.coupon("TERM20").unwrap().used_count, 0);
}

#[tokio::test]
async fn initialize_rejects_invalid_requests() {
    let app = TestApp::spawn().await;
    app.seed_fee("fee_1", 100);
    app.seed_coupon("FREE", DiscountType::Free, 0);

    let cases = [
        (json!({ "fee_id": "fee_missing", "email": "p@example.com", "amount": 10 }), 404),
        (json!({ "fee_id": "fee_1", "email": "p@example.com", "amount": 150 }), 400),
        (json!({ "fee_id": "fee_1", "email": "p@example.com", "amount": 0 }), 400),
        (json!({ "fee_id": "fee_1", "email": "not-an-email", "amount": 10 }), 422),
        (json!({ "fee_id": "fee_1", "email": "p@example.com", "amount": 10, "coupon_code": "NOPE" }), 400),
        (json!({ "fee_id": "fee_1", "email": "p@example.com", "amount": 10, "coupon_code": "FREE" }), 400),
    ];

    for (payload, expected) in cases {
        let response = app
            .client
            .post(format!("{}/payments/initialize", app.address))
            .json(&payload)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), expected, "{}", payload);
    }

    assert!(app.paystack.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn initialize_maps_provider_rejection_to_bad_gateway() {
    let app = TestApp::spawn().await;
    app.seed_fee("fee_1", 100);

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({ "status": false, "message": "Invalid key" })),
        )
        .mount(&app.paystack)
        .await;

    let response = app
        .client
        .post(format!("{}/payments/initialize", app.address))
        .json(&json!({ "fee_id": "fee_1", "email": "parent@example.com", "amount": 10 }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(!body["error"].as_str().unwrap().contains("Invalid key"));
}

#[tokio::test]
async fn lists_fee_payments_newest_first() {
    let app = TestApp::spawn().await;
    app.seed_fee("fee_1", 100);

    let mut older = charge_success("ref_old", "fee_1", 1000);
    older = older.replace("2026-01-15T10:30:00.000Z", "2026-01-10T08:00:00.000Z");
    app.post_signed_webhook(&older).await;
    app.post_signed_webhook(&charge_success("ref_new", "fee_1", 2000))
        .await;

    let response = app
        .client
        .get(format!("{}/fees/fee_1/payments", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let body: Vec<serde_json::Value> = response.json().await.unwrap();
    assert_eq!(body.len(), 2);
    assert_eq!(body[0]["reference"], "ref_new");
    assert_eq!(body[1]["reference"], "ref_old");
    assert_eq!(body[0]["amount"], 20.0);
    assert_eq!(body[0]["payment_method"], "paystack");
}

#[tokio::test]
async fn listing_payments_for_unknown_fee_is_not_found() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/fees/fee_missing/payments", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 404);
}
