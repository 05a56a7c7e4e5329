mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use common::{id_of, names, TestApp};
use rust_decimal::Decimal;
use serde_json::json;

#[tokio::test]
async fn list_paginates_with_name_order_by_default() -> Result<()> {
    let app = TestApp::spawn();
    for name in ["Garden", "Books", "Electronics"] {
        app.create_named(name, None).await?;
    }

    let res = app.get("/api/v1/categories?page=1&limit=2").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(names(res.data()), vec!["Books", "Electronics"]);
    assert_eq!(res.body["pagination"], json!({ "page": 1, "limit": 2, "total": 3, "pages": 2 }));

    let res = app.get("/api/v1/categories?page=2&limit=2").await?;
    assert_eq!(names(res.data()), vec!["Garden"]);
    Ok(())
}

#[tokio::test]
async fn list_filters_by_parent_and_populates_parent_ref() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    app.create_named("Phones", Some(&electronics)).await?;
    app.create_named("Laptops", Some(&electronics)).await?;
    app.create_named("Books", None).await?;

    let roots = app.get("/api/v1/categories?parent=null").await?;
    assert_eq!(names(roots.data()), vec!["Books", "Electronics"]);

    let uri = format!("/api/v1/categories?parent={}&sort=name&order=desc", id_of(&electronics)?);
    let children = app.get(&uri).await?;
    assert_eq!(names(children.data()), vec!["Phones", "Laptops"]);
    assert_eq!(children.data()[0]["parentRef"]["name"], "Electronics");
    assert_eq!(children.data()[0]["parentRef"]["slug"], "electronics");
    Ok(())
}

#[tokio::test]
async fn list_search_and_product_counts() -> Result<()> {
    let app = TestApp::spawn();
    let phones = app
        .create(json!({ "name": "Phones", "description": "Smart and feature phones" }))
        .await?;
    app.create(json!({ "name": "Garden", "description": "Outdoor tools" }))
        .await?;
    app.add_product("Pixel", Decimal::new(59900, 2), &phones).await?;

    let res = app
        .get("/api/v1/categories?search=SMART&includeProducts=true")
        .await?;
    assert_eq!(names(res.data()), vec!["Phones"]);
    assert_eq!(res.data()[0]["activeProductCount"], 1);
    Ok(())
}

#[tokio::test]
async fn list_rejects_bad_query_values() -> Result<()> {
    let app = TestApp::spawn();

    let res = app.get("/api/v1/categories?sort=price").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "VALIDATION_ERROR");

    let res = app.get("/api/v1/categories?parent=not-a-uuid").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/v1/categories?page=0").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.get("/api/v1/categories?page=9223372036854775807&limit=20").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "VALIDATION_ERROR");

    let res = app.get("/api/v1/categories?limit=abc").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn tree_nests_active_categories_by_sort_order() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create(json!({ "name": "Electronics", "sortOrder": 2 })).await?;
    app.create(json!({ "name": "Books", "sortOrder": 1 })).await?;
    let phones = app.create_named("Phones", Some(&electronics)).await?;
    app.create(json!({ "name": "Hidden", "parent": electronics["id"], "isActive": false }))
        .await?;
    app.add_product("Pixel", Decimal::new(59900, 2), &phones).await?;

    let res = app.get("/api/v1/categories/tree?includeProducts=true").await?;
    assert_eq!(res.status, StatusCode::OK);

    let forest = res.data();
    assert_eq!(names(forest), vec!["Books", "Electronics"]);
    let electronics_node = &forest[1];
    assert_eq!(names(&electronics_node["children"]), vec!["Phones"]);
    assert_eq!(electronics_node["children"][0]["activeProductCount"], 1);
    assert_eq!(electronics_node["activeProductCount"], 0);
    Ok(())
}

#[tokio::test]
async fn show_by_slug_counts_views_and_populates_refs() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    let phones = app.create_named("Phones", Some(&electronics)).await?;
    app.create_named("Smartphones", Some(&phones)).await?;

    let res = app
        .get("/api/v1/categories/smartphones")
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["viewCount"], 1);
    assert_eq!(res.data()["level"], 2);
    assert_eq!(res.data()["parentRef"]["name"], "Phones");
    assert_eq!(names(&res.data()["pathRefs"]), vec!["Electronics", "Phones"]);
    assert!(res.data().get("childCategories").is_none());

    let uri = format!("/api/v1/categories/{}?includeChildren=true", id_of(&phones)?);
    let res = app.get(&uri).await?;
    assert_eq!(names(&res.data()["childCategories"]), vec!["Smartphones"]);
    assert_eq!(res.data()["parentRef"]["slug"], "electronics");
    Ok(())
}

#[tokio::test]
async fn show_includes_recent_active_products() -> Result<()> {
    let app = TestApp::spawn();
    let books = app.create_named("Books", None).await?;
    app.add_product("Novel", Decimal::new(1299, 2), &books).await?;

    let res = app.get("/api/v1/categories/books?includeProducts=true").await?;
    let products = res.data()["products"].as_array().cloned().unwrap_or_default();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Novel");
    Ok(())
}

#[tokio::test]
async fn show_unknown_category_is_not_found() -> Result<()> {
    let app = TestApp::spawn();
    let res = app.get("/api/v1/categories/no-such-thing").await?;

    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["success"], false);
    assert_eq!(res.code(), "CATEGORY_NOT_FOUND");
    Ok(())
}

#[tokio::test]
async fn ancestors_are_returned_root_first() -> Result<()> {
    let app = TestApp::spawn();
    let a = app.create_named("Electronics", None).await?;
    let b = app.create_named("Phones", Some(&a)).await?;
    let c = app.create_named("Smartphones", Some(&b)).await?;

    let res = app
        .get(&format!("/api/v1/categories/{}/ancestors", id_of(&c)?))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(names(res.data()), vec!["Electronics", "Phones"]);

    let res = app
        .get(&format!("/api/v1/categories/{}/ancestors", id_of(&a)?))
        .await?;
    assert_eq!(res.data(), &json!([]));

    let res = app.get("/api/v1/categories/electronics/ancestors").await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn public_routes_do_not_accept_writes_without_a_token() -> Result<()> {
    let app = TestApp::spawn();
    let res = app
        .request(Method::POST, "/api/v1/categories", None, Some(json!({ "name": "Books" })))
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert_eq!(res.code(), "UNAUTHORIZED");
    Ok(())
}
