// tests/comment_tests.rs

use std::str::FromStr;

use blog_backend::{config::Config, routes, state::AppState};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

/// Helper function to spawn the app on a random port for testing.
/// Each test gets its own in-memory SQLite database; the pool is returned so
/// tests can seed rows and assert on storage directly.
async fn spawn_app() -> (String, SqlitePool) {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        admin_email: None,
        admin_password: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

/// Registers a fresh user and returns (token, user_id).
async fn register_and_login(client: &reqwest::Client, address: &str) -> (String, i64) {
    let tag = &uuid::Uuid::new_v4().to_string()[..8];
    let email = format!("u_{}@example.com", tag);
    let username = format!("u_{}", tag);

    let resp = client
        .post(format!("{}/api/auth/register", address))
        .json(&serde_json::json!({
            "email": email,
            "username": username,
            "password": "password123"
        }))
        .send()
        .await
        .expect("Register failed");
    assert_eq!(resp.status().as_u16(), 201);
    let user: serde_json::Value = resp.json().await.unwrap();
    let user_id = user["id"].as_i64().unwrap();

    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .expect("Login failed")
        .json()
        .await
        .unwrap();

    (login["token"].as_str().unwrap().to_string(), user_id)
}

/// Registers a user and promotes it to admin directly in storage.
async fn register_admin(client: &reqwest::Client, address: &str, pool: &SqlitePool) -> String {
    let (_, user_id) = register_and_login(client, address).await;
    sqlx::query("UPDATE users SET role = 'admin' WHERE id = ?")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();

    // Re-login so the token carries the admin role.
    let email: String = sqlx::query_scalar("SELECT email FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap();
    let login: serde_json::Value = client
        .post(format!("{}/api/auth/login", address))
        .json(&serde_json::json!({ "email": email, "password": "password123" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    login["token"].as_str().unwrap().to_string()
}

async fn create_post(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    title: &str,
    status: &str,
) -> i64 {
    let resp = client
        .post(format!("{}/api/posts", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "title": title,
            "content": "Some post content",
            "status": status
        }))
        .send()
        .await
        .expect("Create post failed");
    assert_eq!(resp.status().as_u16(), 201);
    let post: serde_json::Value = resp.json().await.unwrap();
    post["id"].as_i64().unwrap()
}

async fn create_comment(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    post_id: i64,
    parent_id: Option<i64>,
    content: &str,
) -> reqwest::Response {
    client
        .post(format!("{}/api/comments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "post_id": post_id,
            "parent_id": parent_id,
            "content": content
        }))
        .send()
        .await
        .expect("Create comment request failed")
}

async fn bulk_set_active(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    ids: &[i64],
    is_active: bool,
) -> serde_json::Value {
    let resp = client
        .put(format!("{}/api/admin/comments/bulk", address))
        .header("Authorization", format!("Bearer {}", admin_token))
        .json(&serde_json::json!({ "comment_ids": ids, "is_active": is_active }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    resp.json().await.unwrap()
}

#[tokio::test]
async fn commenting_requires_authentication() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/api/comments", address))
        .json(&serde_json::json!({ "post_id": 1, "content": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn commenting_on_draft_post_is_not_found() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;

    let draft_id = create_post(&client, &address, &token, "Draft post", "draft").await;

    let resp = create_comment(&client, &address, &token, draft_id, None, "first!").await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn commenting_on_missing_post_is_not_found() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;

    let resp = create_comment(&client, &address, &token, 4242, None, "anyone here?").await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn author_is_bound_from_the_token_not_the_body() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, user_id) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "A post", "published").await;

    // A client-supplied author_id must be ignored.
    let resp = client
        .post(format!("{}/api/comments", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({
            "post_id": post_id,
            "content": "mine",
            "author_id": 9999
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let comment: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(comment["author_id"].as_i64().unwrap(), user_id);
    assert_eq!(comment["is_reply"], false);
    assert_eq!(comment["replies_count"], 0);
}

#[tokio::test]
async fn reply_must_share_the_parents_post() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;

    let post_a = create_post(&client, &address, &token, "Post A", "published").await;
    let post_b = create_post(&client, &address, &token, "Post B", "published").await;

    let resp = create_comment(&client, &address, &token, post_a, None, "root on A").await;
    let root: serde_json::Value = resp.json().await.unwrap();
    let root_id = root["id"].as_i64().unwrap();

    // Reply targets post B but points at a comment on post A.
    let resp = create_comment(&client, &address, &token, post_b, Some(root_id), "jump").await;
    assert_eq!(resp.status().as_u16(), 400);

    // No state change: post B still has no comments.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = ?")
        .bind(post_b)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn reply_to_missing_parent_is_rejected() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "A post", "published").await;

    let resp = create_comment(&client, &address, &token, post_id, Some(777), "hello?").await;
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn a_comment_can_never_become_its_own_ancestor() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "A post", "published").await;

    let resp = create_comment(&client, &address, &token, post_id, None, "root").await;
    let root: serde_json::Value = resp.json().await.unwrap();
    let root_id = root["id"].as_i64().unwrap();

    let resp = create_comment(&client, &address, &token, post_id, Some(root_id), "child").await;
    let child: serde_json::Value = resp.json().await.unwrap();
    let child_id = child["id"].as_i64().unwrap();

    // The edit path only touches content; a parent_id in the payload is ignored,
    // so the root cannot be re-parented under its own child.
    let resp = client
        .put(format!("{}/api/comments/{}", address, root_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "content": "edited", "parent_id": child_id }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let parent: Option<i64> = sqlx::query_scalar("SELECT parent_id FROM comments WHERE id = ?")
        .bind(root_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(parent, None);
}

#[tokio::test]
async fn thread_view_nests_exactly_one_reply_level() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "Threaded", "published").await;

    let root_a: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "A")
        .await
        .json()
        .await
        .unwrap();
    let a_id = root_a["id"].as_i64().unwrap();

    let reply_b: serde_json::Value =
        create_comment(&client, &address, &token, post_id, Some(a_id), "B")
            .await
            .json()
            .await
            .unwrap();
    let b_id = reply_b["id"].as_i64().unwrap();

    // A reply to a reply: stored, counted, but not materialized in the thread.
    let resp = create_comment(&client, &address, &token, post_id, Some(b_id), "C").await;
    assert_eq!(resp.status().as_u16(), 201);

    let root_d: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "D")
        .await
        .json()
        .await
        .unwrap();
    let d_id = root_d["id"].as_i64().unwrap();

    let thread: serde_json::Value = client
        .get(format!("{}/api/posts/{}/comments", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(thread["post"]["id"].as_i64().unwrap(), post_id);
    assert_eq!(thread["comment_count"], 4);

    // Roots newest-first: D before A.
    let comments = thread["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    assert_eq!(comments[0]["id"].as_i64().unwrap(), d_id);
    assert_eq!(comments[1]["id"].as_i64().unwrap(), a_id);

    // A carries exactly its direct reply B; C stays behind the replies endpoint.
    let a_replies = comments[1]["replies"].as_array().unwrap();
    assert_eq!(a_replies.len(), 1);
    assert_eq!(a_replies[0]["id"].as_i64().unwrap(), b_id);
    assert_eq!(comments[0]["replies"].as_array().unwrap().len(), 0);

    // Deeper levels are paged through the replies endpoint.
    let replies: serde_json::Value = client
        .get(format!("{}/api/comments/{}/replies", address, b_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(replies["parent_comment"]["id"].as_i64().unwrap(), b_id);
    assert_eq!(replies["replies_count"], 1);
    assert_eq!(replies["replies"][0]["content"], "C");
}

#[tokio::test]
async fn thread_view_of_draft_or_missing_post_is_not_found() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let draft_id = create_post(&client, &address, &token, "Hidden", "draft").await;

    let resp = client
        .get(format!("{}/api/posts/{}/comments", address, draft_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    let resp = client
        .get(format!("{}/api/posts/999/comments", address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn deactivation_hides_a_root_but_preserves_its_replies() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let admin_token = register_admin(&client, &address, &pool).await;

    let post_id = create_post(&client, &address, &token, "Scenario", "published").await;

    let a: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "hi")
        .await
        .json()
        .await
        .unwrap();
    let a_id = a["id"].as_i64().unwrap();

    let b: serde_json::Value = create_comment(&client, &address, &token, post_id, Some(a_id), "yo")
        .await
        .json()
        .await
        .unwrap();
    let b_id = b["id"].as_i64().unwrap();

    // Thread before: root [A] with replies [B].
    let thread: serde_json::Value = client
        .get(format!("{}/api/posts/{}/comments", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread["comments"][0]["id"].as_i64().unwrap(), a_id);
    assert_eq!(thread["comments"][0]["replies"][0]["id"].as_i64().unwrap(), b_id);

    // Deactivate A.
    let result = bulk_set_active(&client, &address, &admin_token, &[a_id], false).await;
    assert_eq!(result["updated"], 1);

    // Thread after: no roots, but B still counts as an active comment.
    let thread: serde_json::Value = client
        .get(format!("{}/api/posts/{}/comments", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread["comments"].as_array().unwrap().len(), 0);
    assert_eq!(thread["comment_count"], 1);

    // A is gone from the public listing and detail view.
    let list: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments?post={}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(list.iter().all(|c| c["id"].as_i64() != Some(a_id)));

    let resp = client
        .get(format!("{}/api/comments/{}", address, a_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);

    // But B stays in storage and remains reachable through A's replies endpoint.
    let replies: serde_json::Value = client
        .get(format!("{}/api/comments/{}/replies", address, a_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(replies["parent_comment"]["id"].as_i64().unwrap(), a_id);
    assert_eq!(replies["parent_comment"]["is_active"], false);
    assert_eq!(replies["replies"][0]["id"].as_i64().unwrap(), b_id);
    assert_eq!(replies["replies_count"], 1);

    // Reactivation restores the thread.
    bulk_set_active(&client, &address, &admin_token, &[a_id], true).await;
    let thread: serde_json::Value = client
        .get(format!("{}/api/posts/{}/comments", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(thread["comments"][0]["id"].as_i64().unwrap(), a_id);
    assert_eq!(thread["comment_count"], 2);
}

#[tokio::test]
async fn only_the_author_may_edit_or_delete() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (author_token, _) = register_and_login(&client, &address).await;
    let (other_token, _) = register_and_login(&client, &address).await;

    let post_id = create_post(&client, &address, &author_token, "Mine", "published").await;
    let comment: serde_json::Value =
        create_comment(&client, &address, &author_token, post_id, None, "original")
            .await
            .json()
            .await
            .unwrap();
    let comment_id = comment["id"].as_i64().unwrap();

    // Another identity can read but not mutate.
    let resp = client
        .put(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .json(&serde_json::json!({ "content": "hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = client
        .delete(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", other_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    // The author can do both.
    let resp = client
        .put(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", author_token))
        .json(&serde_json::json!({ "content": "edited" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let updated: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(updated["content"], "edited");

    let resp = client
        .delete(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", author_token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    let resp = client
        .get(format!("{}/api/comments/{}", address, comment_id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn deleting_a_comment_cascades_to_its_replies() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "Cascade", "published").await;

    let root: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "root")
        .await
        .json()
        .await
        .unwrap();
    let root_id = root["id"].as_i64().unwrap();

    let reply: serde_json::Value =
        create_comment(&client, &address, &token, post_id, Some(root_id), "reply")
            .await
            .json()
            .await
            .unwrap();
    let reply_id = reply["id"].as_i64().unwrap();

    let resp = client
        .delete(format!("{}/api/comments/{}", address, root_id))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);

    // The reply row is gone too, not merely hidden.
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE id IN (?, ?)")
        .bind(root_id)
        .bind(reply_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn editing_an_inactive_comment_is_not_found() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let admin_token = register_admin(&client, &address, &pool).await;

    let post_id = create_post(&client, &address, &token, "Locked", "published").await;
    let comment: serde_json::Value =
        create_comment(&client, &address, &token, post_id, None, "soon hidden")
            .await
            .json()
            .await
            .unwrap();
    let comment_id = comment["id"].as_i64().unwrap();

    bulk_set_active(&client, &address, &admin_token, &[comment_id], false).await;

    let resp = client
        .put(format!("{}/api/comments/{}", address, comment_id))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "content": "still there?" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 404);
}

#[tokio::test]
async fn listing_supports_filters_search_and_ordering() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (alice_token, alice_id) = register_and_login(&client, &address).await;
    let (bob_token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &alice_token, "Filters", "published").await;

    create_comment(&client, &address, &alice_token, post_id, None, "first about rust").await;
    create_comment(&client, &address, &bob_token, post_id, None, "second about sql").await;
    create_comment(&client, &address, &alice_token, post_id, None, "third about rust too").await;

    // Default ordering: newest first.
    let list: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments?post={}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 3);
    assert_eq!(list[0]["content"], "third about rust too");
    assert_eq!(list[2]["content"], "first about rust");

    // Oldest first when asked.
    let list: Vec<serde_json::Value> = client
        .get(format!(
            "{}/api/comments?post={}&ordering=created_at",
            address, post_id
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list[0]["content"], "first about rust");

    // Author filter.
    let list: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments?author={}", address, alice_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 2);

    // Free-text search over content.
    let list: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments?post={}&search=rust", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 2);
}

#[tokio::test]
async fn my_comments_can_show_deactivated_ones() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let admin_token = register_admin(&client, &address, &pool).await;

    let post_id = create_post(&client, &address, &token, "Mine", "published").await;

    let kept: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "kept")
        .await
        .json()
        .await
        .unwrap();
    let hidden: serde_json::Value =
        create_comment(&client, &address, &token, post_id, None, "hidden")
            .await
            .json()
            .await
            .unwrap();
    let hidden_id = hidden["id"].as_i64().unwrap();

    bulk_set_active(&client, &address, &admin_token, &[hidden_id], false).await;

    // The public listing hides the deactivated comment.
    let list: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments?post={}", address, post_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], kept["id"]);

    // "My comments" shows everything by default...
    let mine: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments/mine", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 2);

    // ...and can be narrowed to just the deactivated ones.
    let mine: Vec<serde_json::Value> = client
        .get(format!("{}/api/comments/mine?is_active=false", address))
        .header("Authorization", format!("Bearer {}", token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0]["id"].as_i64(), Some(hidden_id));
}

#[tokio::test]
async fn bulk_moderation_is_admin_only() {
    let (address, pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;

    let resp = client
        .put(format!("{}/api/admin/comments/bulk", address))
        .header("Authorization", format!("Bearer {}", token))
        .json(&serde_json::json!({ "comment_ids": [1], "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 403);

    let resp = client
        .put(format!("{}/api/admin/comments/bulk", address))
        .json(&serde_json::json!({ "comment_ids": [1], "is_active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // The admin path works and reports the touched row count.
    let admin_token = register_admin(&client, &address, &pool).await;
    let post_id = create_post(&client, &address, &token, "Modded", "published").await;
    let c1: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "one")
        .await
        .json()
        .await
        .unwrap();
    let c2: serde_json::Value = create_comment(&client, &address, &token, post_id, None, "two")
        .await
        .json()
        .await
        .unwrap();

    let result = bulk_set_active(
        &client,
        &address,
        &admin_token,
        &[c1["id"].as_i64().unwrap(), c2["id"].as_i64().unwrap()],
        false,
    )
    .await;
    assert_eq!(result["updated"], 2);

    // The moderation listing still sees them.
    let all: Vec<serde_json::Value> = client
        .get(format!(
            "{}/api/admin/comments?post={}&is_active=false",
            address, post_id
        ))
        .header("Authorization", format!("Bearer {}", admin_token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn comment_content_is_sanitized_and_must_not_end_up_empty() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "Clean", "published").await;

    // Script-only content sanitizes down to nothing and is rejected.
    let resp = create_comment(
        &client,
        &address,
        &token,
        post_id,
        None,
        "<script>alert(1)</script>",
    )
    .await;
    assert_eq!(resp.status().as_u16(), 400);

    // Mixed content keeps the text and drops the script.
    let resp = create_comment(
        &client,
        &address,
        &token,
        post_id,
        None,
        "<b>hello</b><script>alert(1)</script>",
    )
    .await;
    assert_eq!(resp.status().as_u16(), 201);
    let comment: serde_json::Value = resp.json().await.unwrap();
    let content = comment["content"].as_str().unwrap();
    assert!(content.contains("hello"));
    assert!(!content.contains("script"));
}

#[tokio::test]
async fn anonymous_readers_see_the_thread() {
    let (address, _pool) = spawn_app().await;
    let client = reqwest::Client::new();
    let (token, _) = register_and_login(&client, &address).await;
    let post_id = create_post(&client, &address, &token, "Open", "published").await;

    let comment: serde_json::Value =
        create_comment(&client, &address, &token, post_id, None, "visible to all")
            .await
            .json()
            .await
            .unwrap();
    let comment_id = comment["id"].as_i64().unwrap();

    // No Authorization header on any of these.
    for url in [
        format!("{}/api/comments", address),
        format!("{}/api/comments/{}", address, comment_id),
        format!("{}/api/comments/{}/replies", address, comment_id),
        format!("{}/api/posts/{}/comments", address, post_id),
    ] {
        let resp = client.get(&url).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 200, "GET {} should be public", url);
    }
}
