mod support;

use serde_json::{json, Value};
use support::{json, spawn_app};

fn slugs(body: &Value) -> Vec<String> {
    body["articles"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["slug"].as_str().unwrap().to_owned())
        .collect()
}

#[tokio::test]
async fn create_favorite_and_read_back() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let article = app.create_article(&alice, "Hello World", &["t1"]).await;
    let slug = article["slug"].as_str().unwrap().to_owned();
    assert!(slug.starts_with("hello-world-"));
    assert_eq!(article["tagList"], json!(["t1"]));
    assert_eq!(article["favorited"], false);
    assert_eq!(article["favoritesCount"], 0);
    assert_eq!(article["author"]["username"], "alice");

    let favorited = json(
        app.post(&format!("/articles/{slug}/favorite"), Some(&bob))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(favorited["article"]["favorited"], true);
    assert_eq!(favorited["article"]["favoritesCount"], 1);

    let anonymous = json(
        app.get(&format!("/articles/{slug}"), None)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(anonymous["article"]["favorited"], false);
    assert_eq!(anonymous["article"]["favoritesCount"], 1);

    let unfavorited = json(
        app.delete(&format!("/articles/{slug}/favorite"), Some(&bob))
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(unfavorited["article"]["favorited"], false);
    assert_eq!(unfavorited["article"]["favoritesCount"], 0);
}

#[tokio::test]
async fn missing_article_is_not_found() {
    let app = spawn_app().await;
    let response = app.get("/articles/no-such-slug", None).send().await.unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn writing_requires_authentication() {
    let app = spawn_app().await;
    let response = app
        .post("/articles", None)
        .json(&json!({ "article": { "title": "t", "description": "d", "body": "b" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
    assert_eq!(
        app.get("/articles/feed", None)
            .send()
            .await
            .unwrap()
            .status(),
        401
    );
}

#[tokio::test]
async fn duplicate_title_from_same_author_is_rejected() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    app.create_article(&alice, "Same Title", &[]).await;

    let response = app
        .post("/articles", Some(&alice))
        .json(&json!({ "article": { "title": "Same Title", "description": "d", "body": "b" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    assert_eq!(json(response).await["errors"]["title"], json!(["must be unique"]));
}

#[tokio::test]
async fn blank_article_fields_are_reported() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let response = app
        .post("/articles", Some(&alice))
        .json(&json!({ "article": { "title": "Only a title" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let errors = &json(response).await["errors"];
    assert_eq!(errors["description"], json!(["can't be blank"]));
    assert_eq!(errors["body"], json!(["can't be blank"]));
}

#[tokio::test]
async fn list_filters_by_tag_author_and_favorite() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let first = app.create_article(&alice, "First", &["rust"]).await;
    let second = app.create_article(&bob, "Second", &["go"]).await;
    let third = app.create_article(&alice, "Third", &["go"]).await;
    let slug = |a: &Value| a["slug"].as_str().unwrap().to_owned();

    app.post(&format!("/articles/{}/favorite", slug(&first)), Some(&bob))
        .send()
        .await
        .unwrap();

    let all = json(app.get("/articles", None).send().await.unwrap()).await;
    assert_eq!(all["articlesCount"], 3);
    assert_eq!(slugs(&all), vec![slug(&third), slug(&second), slug(&first)]);

    let tagged = json(app.get("/articles?tag=go", None).send().await.unwrap()).await;
    assert_eq!(slugs(&tagged), vec![slug(&third), slug(&second)]);

    let by_alice = json(app.get("/articles?author=alice", None).send().await.unwrap()).await;
    assert_eq!(by_alice["articlesCount"], 2);

    let favorited = json(
        app.get("/articles?favorited=bob", None)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(slugs(&favorited), vec![slug(&first)]);

    let page = json(
        app.get("/articles?limit=1&offset=1", None)
            .send()
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(page["articlesCount"], 3);
    assert_eq!(slugs(&page), vec![slug(&second)]);
}

#[tokio::test]
async fn feed_shows_followed_authors_only() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;
    let alices = app.create_article(&alice, "From Alice", &[]).await;
    app.create_article(&carol, "From Carol", &[]).await;

    app.post("/profiles/alice/follow", Some(&bob))
        .send()
        .await
        .unwrap();

    let feed = json(app.get("/articles/feed", Some(&bob)).send().await.unwrap()).await;
    assert_eq!(feed["articlesCount"], 1);
    assert_eq!(feed["articles"][0]["slug"], alices["slug"]);
    assert_eq!(feed["articles"][0]["author"]["following"], true);
}

#[tokio::test]
async fn only_the_author_updates_or_deletes() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let article = app.create_article(&alice, "Original", &["old"]).await;
    let slug = article["slug"].as_str().unwrap().to_owned();

    let forbidden = app
        .put(&format!("/articles/{slug}"), Some(&bob))
        .json(&json!({ "article": { "title": "Hijacked" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), 403);

    let updated = app
        .put(&format!("/articles/{slug}"), Some(&alice))
        .json(&json!({ "article": { "title": "Renamed", "tagList": ["new"] } }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), 200);
    let updated = json(updated).await;
    assert_eq!(updated["article"]["title"], "Renamed");
    assert_eq!(updated["article"]["tagList"], json!(["new"]));
    let new_slug = updated["article"]["slug"].as_str().unwrap().to_owned();
    assert!(new_slug.starts_with("renamed-"));

    let not_deleted = app
        .delete(&format!("/articles/{new_slug}"), Some(&bob))
        .send()
        .await
        .unwrap();
    assert_eq!(not_deleted.status(), 403);

    let deleted = app
        .delete(&format!("/articles/{new_slug}"), Some(&alice))
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status(), 200);
    assert_eq!(
        app.get(&format!("/articles/{new_slug}"), None)
            .send()
            .await
            .unwrap()
            .status(),
        404
    );
}

#[tokio::test]
async fn comments_flow() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let article = app.create_article(&alice, "Discuss", &[]).await;
    let slug = article["slug"].as_str().unwrap().to_owned();
    let path = format!("/articles/{slug}/comments");

    let created = app
        .post(&path, Some(&alice))
        .json(&json!({ "comment": { "body": "first!" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let comment = json(created).await["comment"].clone();
    assert_eq!(comment["body"], "first!");
    assert_eq!(comment["author"]["username"], "alice");
    let id = comment["id"].as_i64().unwrap();

    app.post(&path, Some(&bob))
        .json(&json!({ "comment": { "body": "second" } }))
        .send()
        .await
        .unwrap();

    let listed = json(app.get(&path, None).send().await.unwrap()).await;
    assert_eq!(listed["comments"].as_array().unwrap().len(), 2);
    assert_eq!(listed["comments"][0]["body"], "first!");

    let bobs = json(app.get(&format!("{path}?author=bob"), None).send().await.unwrap()).await;
    assert_eq!(bobs["comments"].as_array().unwrap().len(), 1);

    let by_stranger = app
        .delete(&format!("{path}/{id}"), Some(&bob))
        .send()
        .await
        .unwrap();
    assert_eq!(by_stranger.status(), 404);

    let by_author = app
        .delete(&format!("{path}/{id}"), Some(&alice))
        .send()
        .await
        .unwrap();
    assert_eq!(by_author.status(), 200);
    let listed = json(app.get(&path, None).send().await.unwrap()).await;
    assert_eq!(listed["comments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn popular_tags() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    app.create_article(&alice, "One", &["rust", "web"]).await;
    app.create_article(&bob, "Two", &["rust"]).await;

    let tags = json(app.get("/tags", None).send().await.unwrap()).await;
    assert_eq!(tags["tags"], json!(["rust", "web"]));

    let bobs = json(app.get("/tags?author=bob", None).send().await.unwrap()).await;
    assert_eq!(bobs["tags"], json!(["rust"]));
}
