mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn tenant_booking_defaults_rent_to_listing_price() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let tenant = server.tenant_token("eve@example.com").await?;
    let listing = server.create_listing(&admin, "Corner House").await?;

    let booking = server
        .create_booking(&tenant, &common::id_of(&listing), "2026-03-01", "2027-02-28")
        .await?;
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["rent_amount"], listing["price"]);
    Ok(())
}

#[tokio::test]
async fn bookings_are_private_to_their_tenant() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let eve = server.tenant_token("eve@example.com").await?;
    let fay = server.tenant_token("fay@example.com").await?;
    let listing = common::id_of(&server.create_listing(&admin, "Mews").await?);

    let booking = server.create_booking(&eve, &listing, "2026-03-01", "2026-09-01").await?;
    server.create_booking(&fay, &listing, "2026-04-01", "2026-10-01").await?;
    let path = format!("/api/bookings/{}", common::id_of(&booking));

    assert_eq!(server.get(&path, &fay).await?.status(), StatusCode::NOT_FOUND);
    assert_eq!(server.get(&path, &eve).await?.status(), StatusCode::OK);

    let mine = common::data(server.get("/api/bookings", &eve).await?).await?;
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
    let all = common::data(server.get("/api/bookings", &admin).await?).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[tokio::test]
async fn booking_validation_and_missing_listing() -> Result<()> {
    let server = common::spawn_server().await?;
    let tenant = server.tenant_token("gus@example.com").await?;

    let res = server
        .post("/api/bookings", Some(&tenant), json!({ "start_date": "2026-05-01", "end_date": "2026-04-01" }))
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = server
        .post(
            "/api/bookings",
            Some(&tenant),
            json!({
                "listing_id": "6f1c2d8e-9a43-4d0f-8b1e-2f3a4b5c6d7e",
                "start_date": "2026-04-01",
                "end_date": "2026-05-01"
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn tenant_can_cancel_but_not_approve() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let tenant = server.tenant_token("hal@example.com").await?;
    let listing = common::id_of(&server.create_listing(&admin, "Boathouse").await?);
    let booking = server.create_booking(&tenant, &listing, "2026-06-01", "2026-12-01").await?;
    let path = format!("/api/bookings/{}", common::id_of(&booking));

    let res = server.patch(&path, &tenant, json!({ "status": "approved" })).await?;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let cancelled = common::data(server.patch(&path, &tenant, json!({ "status": "cancelled" })).await?).await?;
    assert_eq!(cancelled["status"], "cancelled");
    Ok(())
}

#[tokio::test]
async fn admin_books_only_for_registered_users() -> Result<()> {
    let server = common::spawn_server().await?;
    let admin = server.admin_token().await?;
    let tenant = server.tenant_token("ida@example.com").await?;
    let tenant_id = common::id_of(&common::data(server.get("/api/auth/whoami", &tenant).await?).await?);
    let listing = common::id_of(&server.create_listing(&admin, "Gatehouse").await?);

    let res = server
        .post(
            "/api/bookings",
            Some(&admin),
            json!({
                "listing_id": listing,
                "tenant_id": "6f1c2d8e-9a43-4d0f-8b1e-2f3a4b5c6d7e",
                "start_date": "2026-04-01",
                "end_date": "2026-10-01"
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = server
        .post(
            "/api/bookings",
            Some(&admin),
            json!({
                "listing_id": listing,
                "tenant_id": tenant_id,
                "start_date": "2026-04-01",
                "end_date": "2026-10-01"
            }),
        )
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let booking = common::data(res).await?;
    assert_eq!(booking["tenant_id"], tenant_id.as_str());

    let all = common::data(server.get("/api/bookings", &admin).await?).await?;
    assert_eq!(all.as_array().map(Vec::len), Some(1));
    Ok(())
}
