use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::cookie::{Cookie, Key};
use actix_web::{test, web, App};
use kgviz_auth::{configure, UserService};
use kgviz_database::Database;
use kgviz_models::auth::RegisterRequest;
use serde_json::{json, Value};

async fn service() -> UserService {
    let users = UserService::new(Database::in_memory().await.unwrap(), 4);
    users
        .create_superuser(&RegisterRequest::new("root", "root@example.com", "rootpw"))
        .await
        .unwrap();
    users
}

macro_rules! app {
    ($users:expr) => {
        test::init_service(
            App::new()
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new($users.clone()))
                .configure(configure),
        )
        .await
    };
}

fn session_cookie(resp: &actix_web::dev::ServiceResponse) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "id")
        .map(|c| c.into_owned())
        .expect("session cookie")
}

#[actix_web::test]
async fn test_create_list_and_update_users() {
    let users = service().await;
    let app = app!(users);

    let req = test::TestRequest::post()
        .uri("/api/users/users/")
        .set_json(json!({"username": "alice", "email": "alice@example.com", "password": "pw"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ret"], 0);
    assert_eq!(body["msg"], "user created");
    assert_eq!(body["data"]["username"], "alice");
    let alice_id = body["data"]["id"].as_i64().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/users/users/")
        .set_json(json!({"username": "alice", "email": "a2@example.com", "password": "pw"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ret": 1, "msg": "username already exists"}));

    let req = test::TestRequest::get()
        .uri("/api/users/users/?q=ali")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].get("password_hash").is_none());

    let req = test::TestRequest::put()
        .uri(&format!("/api/users/users/{}/", alice_id))
        .set_json(json!({"first_name": "Alice", "is_staff": true}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["msg"], "user updated");
    assert_eq!(body["data"]["first_name"], "Alice");

    let req = test::TestRequest::get().uri("/api/users/stats/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(
        body["data"],
        json!({"total_users": 2, "active_users": 2, "inactive_users": 0, "staff_users": 2, "superusers": 1})
    );

    let req = test::TestRequest::get().uri("/api/users/users/999/").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ret": 1, "msg": "user not found"}));
}

#[actix_web::test]
async fn test_login_session_guards_self_delete() {
    let users = service().await;
    let bob = users
        .register(&RegisterRequest::new("bob", "bob@example.com", "bobpw"))
        .await
        .unwrap();
    let carol = users
        .register(&RegisterRequest::new("carol", "carol@example.com", "carolpw"))
        .await
        .unwrap();
    let app = app!(users);

    let req = test::TestRequest::post()
        .uri("/api/users/login/")
        .set_json(json!({"username": "bob", "password": "wrong"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ret": 1, "msg": "invalid username or password"}));

    let req = test::TestRequest::post()
        .uri("/api/users/login/")
        .set_json(json!({"username": "bob", "password": "bobpw"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let cookie = session_cookie(&resp);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["msg"], "login successful");
    assert_eq!(body["data"]["username"], "bob");

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/users/{}/", bob.id))
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ret": 1, "msg": "you cannot delete your own account"}));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/users/users/{}/", carol.id))
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ret": 0, "msg": "user deleted"}));

    let req = test::TestRequest::post()
        .uri("/api/users/logout/")
        .cookie(cookie)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body, json!({"ret": 0, "msg": "logged out"}));
}
