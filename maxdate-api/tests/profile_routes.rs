mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{create_test_app, profile_body, PNG};

#[tokio::test]
async fn cities_are_listed_and_searchable() {
    let app = create_test_app();

    let all = app.get("/api/cities", None).await;
    assert_eq!(all.status, StatusCode::OK);
    let list = all.data().as_array().unwrap();
    assert!(list.len() > 20);
    assert_eq!(list[0]["name"], "Москва");

    let found = app.get("/api/cities?q=%D0%BA%D0%B0%D0%B7", None).await;
    let names: Vec<&str> = found.data().as_array().unwrap().iter().filter_map(|c| c["name"].as_str()).collect();
    assert!(names.contains(&"Казань"), "{names:?}");
}

#[tokio::test]
async fn create_read_and_update_profile() {
    let app = create_test_app();
    let (_, token) = app.signed_in("anna@mail.ru").await;

    let missing = app.get("/api/profiles/me", Some(&token)).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let created = app
        .post_json("/api/profiles", Some(&token), profile_body("Анна", "female", "1998-04-12"))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{:?}", created.body);
    assert_eq!(created.data()["firstName"], "Анна");
    assert_eq!(created.data()["city"]["id"], 1);
    assert_eq!(created.data()["isVisible"], true);

    let updated = app
        .put_json(
            "/api/profiles",
            Some(&token),
            json!({ "bio": "Люблю книги", "preferredAgeMin": 25, "preferredAgeMax": 35 }),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.data()["bio"], "Люблю книги");
    assert_eq!(updated.data()["preferredAgeMax"], 35);

    let cleared = app.put_json("/api/profiles", Some(&token), json!({ "bio": null })).await;
    assert!(cleared.data()["bio"].is_null());
    assert_eq!(cleared.data()["preferredAgeMin"], 25);

    let inverted = app.put_json("/api/profiles", Some(&token), json!({ "preferredAgeMin": 40 })).await;
    assert_eq!(inverted.status, StatusCode::BAD_REQUEST);
    assert_eq!(inverted.error_code(), "E2004");
}

#[tokio::test]
async fn profile_validation_errors() {
    let app = create_test_app();
    let (_, token) = app.signed_in("anna@mail.ru").await;

    let mut bad_link = profile_body("Анна", "female", "1998-04-12");
    bad_link["vkLink"] = json!("https://vk.com/anna");
    let res = app.post_json("/api/profiles", Some(&token), bad_link).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.error_code(), "E0002");
    assert!(res.body["error"]["details"]["vk_link"].is_array());

    let too_young = app
        .post_json("/api/profiles", Some(&token), profile_body("Анна", "female", "2020-01-01"))
        .await;
    assert_eq!(too_young.error_code(), "E2003");

    let mut nowhere = profile_body("Анна", "female", "1998-04-12");
    nowhere["cityId"] = json!(9999);
    let res = app.post_json("/api/profiles", Some(&token), nowhere).await;
    assert_eq!(res.error_code(), "E2005");
}

#[tokio::test]
async fn photo_upload_limits_and_main_selection() {
    let app = create_test_app();
    let (_, token) = app.signed_in("anna@mail.ru").await;

    let no_profile = app.upload_photo("/api/profiles/photos", &token, "image/png", PNG).await;
    assert_eq!(no_profile.status, StatusCode::NOT_FOUND);
    assert_eq!(no_profile.error_code(), "E3004");

    app.post_json("/api/profiles", Some(&token), profile_body("Анна", "female", "1998-04-12"))
        .await;

    let gif = app.upload_photo("/api/profiles/photos", &token, "image/gif", PNG).await;
    assert_eq!(gif.status, StatusCode::BAD_REQUEST);
    assert_eq!(gif.error_code(), "E2010");

    let first = app.upload_photo("/api/profiles/photos", &token, "image/png", PNG).await;
    assert_eq!(first.status, StatusCode::CREATED);
    assert_eq!(first.data()["isMain"], true);
    let first_id = first.data()["id"].as_str().unwrap().to_string();

    let only = app.delete(&format!("/api/profiles/photos/{first_id}"), Some(&token)).await;
    assert_eq!(only.status, StatusCode::BAD_REQUEST);
    assert_eq!(only.error_code(), "E2009");

    let second = app.upload_photo("/api/profiles/photos?isMain=true", &token, "image/jpeg", PNG).await;
    assert_eq!(second.data()["isMain"], true);
    let second_id = second.data()["id"].as_str().unwrap().to_string();

    let own = app.get("/api/profiles/me", Some(&token)).await;
    let photos = own.data()["photos"].as_array().unwrap();
    assert_eq!(photos.len(), 2);
    assert_eq!(photos[0]["id"], second_id.as_str());
    assert_eq!(photos[1]["isMain"], false);

    let main = app
        .send(
            axum::http::Request::builder()
                .method("PUT")
                .uri(format!("/api/profiles/photos/{first_id}/main"))
                .header("Authorization", format!("Bearer {token}"))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(main.status, StatusCode::OK);
    assert_eq!(main.data()["isMain"], true);

    for _ in 0..3 {
        app.upload_photo("/api/profiles/photos", &token, "image/png", PNG).await;
    }
    let sixth = app.upload_photo("/api/profiles/photos", &token, "image/png", PNG).await;
    assert_eq!(sixth.status, StatusCode::BAD_REQUEST);
    assert_eq!(sixth.error_code(), "E2007");
    assert_eq!(app.storage.len().await, 5);
}

#[tokio::test]
async fn hidden_profiles_are_not_displayed() {
    let app = create_test_app();
    let (_, viewer) = app.signed_in("ivan@mail.ru").await;
    let (_, token) = app.signed_in("anna@mail.ru").await;
    let created = app
        .post_json("/api/profiles", Some(&token), profile_body("Анна", "female", "1998-04-12"))
        .await;
    let profile_id = created.data()["id"].as_str().unwrap().to_string();

    let shown = app.get(&format!("/api/profiles/{profile_id}"), Some(&viewer)).await;
    assert_eq!(shown.status, StatusCode::OK);
    assert_eq!(shown.data()["email"], "anna@mail.ru");

    app.put_json("/api/profiles", Some(&token), json!({ "hideEmail": true })).await;
    let shown = app.get(&format!("/api/profiles/{profile_id}"), Some(&viewer)).await;
    assert!(shown.data().get("email").is_none());

    app.put_json("/api/profiles", Some(&token), json!({ "isVisible": false })).await;
    let hidden = app.get(&format!("/api/profiles/{profile_id}"), Some(&viewer)).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}
