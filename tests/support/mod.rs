#![allow(dead_code)]

use std::{net::TcpListener, sync::Arc};

use conduit::{config::AppConfig, init_db_pool, make_router, run_app, AppState};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};

pub struct TestApp {
    pub address: String,
    pub client: Client,
}

/// Serves the full router over a fresh in-memory database on a free port.
pub async fn spawn_app() -> TestApp {
    let pool = init_db_pool("sqlite::memory:").await.unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    let state = Arc::new(AppState {
        pool,
        config: AppConfig::for_database("sqlite::memory:", "integration-secret"),
    });
    tokio::spawn(run_app(
        make_router(),
        listener,
        state,
        std::future::pending(),
    ));
    TestApp {
        address,
        client: Client::new(),
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    pub fn get(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.get(self.url(path)), token)
    }

    pub fn post(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.post(self.url(path)), token)
    }

    pub fn put(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.put(self.url(path)), token)
    }

    pub fn delete(&self, path: &str, token: Option<&str>) -> RequestBuilder {
        authorize(self.client.delete(self.url(path)), token)
    }

    /// Registers `username` and returns its token.
    pub async fn register(&self, username: &str) -> String {
        let response = self
            .post("/users", None)
            .json(&json!({
                "user": {
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "password",
                }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["user"]["token"].as_str().unwrap().to_owned()
    }

    /// Creates an article and returns its JSON.
    pub async fn create_article(&self, token: &str, title: &str, tags: &[&str]) -> Value {
        let response = self
            .post("/articles", Some(token))
            .json(&json!({
                "article": {
                    "title": title,
                    "description": "description",
                    "body": "body",
                    "tagList": tags,
                }
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        body["article"].clone()
    }
}

fn authorize(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.header("Authorization", format!("Token {token}")),
        None => request,
    }
}

pub async fn json(response: Response) -> Value {
    response.json().await.unwrap()
}
