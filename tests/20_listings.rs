mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};

#[tokio::test]
async fn create_then_fetch_returns_same_listing() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let created = server.create_listing(&admin, "Harbour Flat").await?;
    let id = common::id_of(&created);

    let fetched = common::data(server.get(&format!("/api/listings/{}", id), &admin).await?).await?;
    assert_eq!(fetched["title"], "Harbour Flat");
    assert_eq!(fetched["address"], "12 Harbour Road");
    assert_eq!(fetched["price"], created["price"]);
    assert_eq!(fetched["amenities"], json!(["balcony", "parking"]));
    assert_eq!(fetched["status"], "available");
    Ok(())
}

#[tokio::test]
async fn tenants_read_but_cannot_write_listings() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let tenant = server.tenant_token("dee@example.com").await?;
    let listing = server.create_listing(&admin, "Garden Studio").await?;

    let all = common::data(server.get("/api/listings", &tenant).await?).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(1));

    let res = server
        .post("/api/listings", Some(&tenant), json!({ "title": "Mine", "address": "x", "price": 1 }))
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = server
        .delete(&format!("/api/listings/{}", common::id_of(&listing)), &tenant)
        .await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn update_filter_and_delete() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let first = server.create_listing(&admin, "North Loft").await?;
    server.create_listing(&admin, "South Loft").await?;
    let path = format!("/api/listings/{}", common::id_of(&first));

    let updated = common::data(
        server
            .patch(&path, &admin, json!({ "status": "unavailable", "price": 1500 }))
            .await?,
    )
    .await?;
    assert_eq!(updated["status"], "unavailable");

    let unavailable = common::data(server.get("/api/listings?status=unavailable", &admin).await?).await?;
    assert_eq!(unavailable.as_array().map(Vec::len), Some(1));

    let res = server.get("/api/listings?status=haunted", &admin).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(server.delete(&path, &admin).await?.status(), StatusCode::NO_CONTENT);
    let res = server.get(&path, &admin).await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.json::<Value>().await?["code"], "NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn invalid_listing_is_rejected_with_fields() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let res = server
        .post(
            "/api/listings",
            Some(&admin),
            json!({ "title": "", "price": -5, "images": ["ftp://nope"] }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = res.json::<Value>().await?;
    for field in ["title", "address", "price", "images"] {
        assert!(body["field_errors"][field].is_string(), "missing error for {}", field);
    }
    Ok(())
}

#[tokio::test]
async fn price_beyond_cents_or_column_range_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    for price in ["1.005", "10000000000"] {
        let res = server
            .post(
                "/api/listings",
                Some(&admin),
                json!({ "title": "Annex", "address": "4 Yard Ln", "price": price }),
            )
            .await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "price {}", price);
        let body = res.json::<Value>().await?;
        assert!(body["field_errors"]["price"].is_string(), "price {}", price);
    }

    let listing = server.create_listing(&admin, "Annex").await?;
    let path = format!("/api/listings/{}", common::id_of(&listing));
    let res = server.patch(&path, &admin, json!({ "price": "12.345" })).await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let fetched = common::data(server.get(&path, &admin).await?).await?;
    assert_eq!(fetched["price"], listing["price"]);
    Ok(())
}
