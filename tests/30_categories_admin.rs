mod common;

use std::str::FromStr;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use catalog_api::catalog::{CategoryPatch, CategoryStore};
use common::{id_of, mint, names, TestApp};
use rust_decimal::Decimal;
use serde_json::{json, Value};

fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|s| Decimal::from_str(s).ok())
        .unwrap_or_else(|| panic!("not a decimal string: {}", value))
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() -> Result<()> {
    let app = TestApp::spawn();
    let body = Some(json!({ "name": "Books" }));

    let res = app
        .request(Method::POST, "/api/v1/categories", None, body.clone())
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .request(Method::POST, "/api/v1/categories", Some("not.a.jwt"), body.clone())
        .await?;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);

    let res = app
        .request(Method::POST, "/api/v1/categories", Some(&app.customer_token), body.clone())
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.code(), "FORBIDDEN");

    let res = app
        .request(Method::POST, "/api/v1/categories", Some(&mint("ops", "admin")), body)
        .await?;
    assert_eq!(res.status, StatusCode::CREATED);
    Ok(())
}

#[tokio::test]
async fn read_only_admin_routes_are_guarded_too() -> Result<()> {
    let app = TestApp::spawn();
    let books = app.create_named("Books", None).await?;
    let id = id_of(&books)?;

    for uri in [
        format!("/api/v1/categories/{}/analytics", id),
        format!("/api/v1/categories/{}/descendants", id),
    ] {
        let res = app.get(&uri).await?;
        assert_eq!(res.status, StatusCode::UNAUTHORIZED, "{}", uri);
        let res = app
            .request(Method::GET, &uri, Some(&app.customer_token), None)
            .await?;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", uri);
    }
    Ok(())
}

#[tokio::test]
async fn create_derives_hierarchy_fields_and_links_parent() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    assert_eq!(electronics["slug"], "electronics");
    assert_eq!(electronics["level"], 0);
    assert_eq!(electronics["path"], json!([]));
    assert_eq!(electronics["isActive"], true);
    assert_eq!(electronics["isFeatured"], false);

    let phones = app
        .create(json!({ "name": "  Mobile Phones & Tablets ", "parent": electronics["id"] }))
        .await?;
    assert_eq!(phones["name"], "Mobile Phones & Tablets");
    assert_eq!(phones["slug"], "mobile-phones-tablets");
    assert_eq!(phones["level"], 1);
    assert_eq!(phones["path"], json!([electronics["id"]]));

    let parent = app.get("/api/v1/categories/electronics").await?;
    assert_eq!(parent.data()["children"], json!([phones["id"]]));
    Ok(())
}

#[tokio::test]
async fn create_reports_conflicts_and_bad_input() -> Result<()> {
    let app = TestApp::spawn();
    app.create_named("Phones", None).await?;

    let res = app
        .admin(Method::POST, "/api/v1/categories", Some(json!({ "name": "Phones" })))
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), "DUPLICATE_NAME");

    let res = app
        .admin(Method::POST, "/api/v1/categories", Some(json!({ "name": "Phones!" })))
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), "DUPLICATE_SLUG");

    let missing_parent = uuid::Uuid::new_v4();
    let res = app
        .admin(
            Method::POST,
            "/api/v1/categories",
            Some(json!({ "name": "Cases", "parent": missing_parent })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "PARENT_NOT_FOUND");

    let res = app
        .admin(Method::POST, "/api/v1/categories", Some(json!({ "name": "   " })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "VALIDATION_ERROR");

    let res = app
        .admin(Method::POST, "/api/v1/categories", Some(json!({ "description": "no name" })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "INVALID_JSON");

    let listing = app.get("/api/v1/categories").await?;
    assert_eq!(names(listing.data()), vec!["Phones"]);
    Ok(())
}

#[tokio::test]
async fn slugs_that_shadow_static_routes_are_rejected() -> Result<()> {
    let app = TestApp::spawn();

    for body in [json!({ "name": "Tree" }), json!({ "name": "Garden", "slug": "Repair" })] {
        let res = app.admin(Method::POST, "/api/v1/categories", Some(body)).await?;
        assert_eq!(res.status, StatusCode::BAD_REQUEST);
        assert_eq!(res.code(), "VALIDATION_ERROR");
    }

    let trees = app.create(json!({ "name": "Tree", "slug": "trees" })).await?;
    let res = app.get("/api/v1/categories/trees").await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["id"], trees["id"]);

    let uri = format!("/api/v1/categories/{}", id_of(&trees)?);
    let res = app.admin(Method::PUT, &uri, Some(json!({ "slug": "tree" }))).await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "VALIDATION_ERROR");
    Ok(())
}

#[tokio::test]
async fn update_renames_without_touching_the_slug() -> Result<()> {
    let app = TestApp::spawn();
    let phones = app.create_named("Phones", None).await?;
    let uri = format!("/api/v1/categories/{}", id_of(&phones)?);

    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "name": "Mobile Phones", "isFeatured": true })))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["name"], "Mobile Phones");
    assert_eq!(res.data()["slug"], "phones");
    assert_eq!(res.data()["isFeatured"], true);

    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "slug": "Mobile-Phones" })))
        .await?;
    assert_eq!(res.data()["slug"], "mobile-phones");
    Ok(())
}

#[tokio::test]
async fn update_refuses_hierarchy_changes() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    let books = app.create_named("Books", None).await?;
    let uri = format!("/api/v1/categories/{}", id_of(&books)?);

    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "parent": electronics["id"] })))
        .await?;
    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(res.code(), "REPARENT_UNSUPPORTED");

    // Same parent as stored is accepted
    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "parent": null, "sortOrder": 4 })))
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["sortOrder"], 4);

    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "level": 3 })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.code(), "INVALID_JSON");
    Ok(())
}

#[tokio::test]
async fn update_reports_conflicts_and_missing_categories() -> Result<()> {
    let app = TestApp::spawn();
    app.create_named("Books", None).await?;
    let garden = app.create_named("Garden", None).await?;
    let uri = format!("/api/v1/categories/{}", id_of(&garden)?);

    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "name": "Books" })))
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), "DUPLICATE_NAME");

    let res = app
        .admin(Method::PUT, &uri, Some(json!({ "slug": "books" })))
        .await?;
    assert_eq!(res.code(), "DUPLICATE_SLUG");

    let res = app
        .admin(
            Method::PUT,
            &format!("/api/v1/categories/{}", uuid::Uuid::new_v4()),
            Some(json!({ "name": "Anything" })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_guards_children_and_products() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    let phones = app.create_named("Phones", Some(&electronics)).await?;
    let product = app.add_product("Pixel", Decimal::new(59900, 2), &phones).await?;

    let res = app
        .admin(Method::DELETE, &format!("/api/v1/categories/{}", id_of(&electronics)?), None)
        .await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), "HAS_CHILDREN");

    let phones_uri = format!("/api/v1/categories/{}", id_of(&phones)?);
    let res = app.admin(Method::DELETE, &phones_uri, None).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), "HAS_PRODUCTS");

    assert!(app.products.remove(product).await);
    let res = app.admin(Method::DELETE, &phones_uri, None).await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, json!({ "success": true, "message": "Category deleted successfully" }));

    let parent = app.get("/api/v1/categories/electronics").await?;
    assert_eq!(parent.data()["children"], json!([]));

    let res = app.admin(Method::DELETE, &phones_uri, None).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn bulk_update_reports_each_item() -> Result<()> {
    let app = TestApp::spawn();
    let books = app.create_named("Books", None).await?;
    let garden = app.create_named("Garden", None).await?;
    let missing = uuid::Uuid::new_v4();

    let res = app
        .admin(
            Method::PUT,
            "/api/v1/categories/bulk/update",
            Some(json!({
                "categories": [
                    { "id": books["id"], "sortOrder": 2 },
                    { "id": garden["id"], "name": "Books" },
                    { "id": missing, "isFeatured": true }
                ]
            })),
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["message"], "Updated 1 categories, 2 failed");
    assert_eq!(names(&res.data()["updated"]), vec!["Books"]);

    let errors = res.data()["errors"].as_array().cloned().unwrap_or_default();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["id"], garden["id"]);
    assert_eq!(errors[1]["id"], json!(missing));

    let res = app
        .admin(Method::PUT, "/api/v1/categories/bulk/update", Some(json!({ "categories": [] })))
        .await?;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.body["error"], "Categories array is required");
    Ok(())
}

#[tokio::test]
async fn analytics_sum_over_the_subtree() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    let phones = app.create_named("Phones", Some(&electronics)).await?;
    let smartphones = app.create_named("Smartphones", Some(&phones)).await?;
    app.create_named("Books", None).await?;

    app.add_product("Cable", Decimal::new(1000, 2), &electronics).await?;
    app.add_product("Pixel", Decimal::new(3000, 2), &smartphones).await?;
    app.get("/api/v1/categories/phones").await?;
    app.get("/api/v1/categories/phones").await?;

    let res = app
        .admin(
            Method::GET,
            &format!("/api/v1/categories/{}/analytics", id_of(&electronics)?),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);

    let data = res.data();
    assert_eq!(data["category"]["name"], "Electronics");
    assert_eq!(data["hierarchy"]["parent"], Value::Null);
    assert_eq!(data["hierarchy"]["descendantsCount"], 2);
    assert_eq!(data["hierarchy"]["totalLevels"], 3);
    assert_eq!(data["products"]["totalProducts"], 2);
    assert_eq!(data["products"]["activeProducts"], 2);
    assert_eq!(decimal(&data["products"]["averagePrice"]), Decimal::new(2000, 2));
    assert_eq!(decimal(&data["products"]["totalValue"]), Decimal::new(4000, 2));
    assert_eq!(data["views"], 2);
    Ok(())
}

#[tokio::test]
async fn descendants_are_listed_breadth_first() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    let phones = app.create_named("Phones", Some(&electronics)).await?;
    app.create_named("Laptops", Some(&electronics)).await?;
    app.create_named("Smartphones", Some(&phones)).await?;

    let res = app
        .admin(
            Method::GET,
            &format!("/api/v1/categories/{}/descendants", id_of(&electronics)?),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let found = names(res.data());
    assert_eq!(found.len(), 3);
    assert_eq!(found[2], "Smartphones");

    let res = app
        .admin(
            Method::GET,
            &format!("/api/v1/categories/{}/descendants", uuid::Uuid::new_v4()),
            None,
        )
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn repair_restores_dropped_child_links() -> Result<()> {
    let app = TestApp::spawn();
    let electronics = app.create_named("Electronics", None).await?;
    let phones = app.create_named("Phones", Some(&electronics)).await?;

    app.store
        .update_by_id(id_of(&electronics)?, CategoryPatch::pull_child(id_of(&phones)?))
        .await?;

    let res = app
        .admin(Method::POST, "/api/v1/categories/repair?dryRun=true", None)
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.data()["dryRun"], true);
    assert_eq!(res.data()["scanned"], 2);
    assert_eq!(res.data()["fixed"][0]["id"], electronics["id"]);
    assert_eq!(res.data()["fixed"][0]["fields"], json!(["children"]));

    let res = app.admin(Method::POST, "/api/v1/categories/repair", None).await?;
    assert_eq!(res.data()["fixed"].as_array().map(Vec::len), Some(1));

    let res = app.admin(Method::POST, "/api/v1/categories/repair", None).await?;
    assert_eq!(res.data()["fixed"], json!([]));

    let parent = app.get("/api/v1/categories/electronics").await?;
    assert_eq!(parent.data()["children"], json!([phones["id"]]));
    Ok(())
}
