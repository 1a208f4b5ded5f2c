use std::sync::Arc;

use actix_web::{
    cookie::{Cookie, Key},
    http::{header, StatusCode},
    test::{self, TestRequest},
    web, App,
};
use uuid::Uuid;

use twitter_web::auth::{session_middleware, SESSION_COOKIE};
use twitter_web::configure;
use twitter_web::service::Service;
use twitter_web::store::MemoryStore;

fn service() -> web::Data<Service> {
    web::Data::new(Service::new(Arc::new(MemoryStore::new()), 4))
}

macro_rules! app {
    ($service:expr) => {
        test::init_service(
            App::new()
                .app_data($service.clone())
                .wrap(session_middleware(Key::generate(), false))
                .configure(configure),
        )
        .await
    };
}

/// Send a request carrying the session cookie in `$jar`, keeping whatever
/// cookie the response sets.
macro_rules! send {
    ($app:expr, $jar:ident, $req:expr) => {{
        let mut req: TestRequest = $req;
        if let Some(cookie) = $jar.clone() {
            req = req.cookie(cookie);
        }
        let resp = test::call_service(&$app, req.to_request()).await;
        if let Some(cookie) = resp
            .response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
        {
            $jar = Some(cookie.into_owned());
        }
        resp
    }};
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn signup_request(username: &str) -> TestRequest {
    TestRequest::post().uri("/signup/").set_form([
        ("username", username),
        ("email", "someone@example.com"),
        ("password1", "s3cret-pass"),
        ("password2", "s3cret-pass"),
    ])
}

async fn body_text<B: actix_web::body::MessageBody>(
    resp: actix_web::dev::ServiceResponse<B>,
) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_web::test]
async fn signup_post_and_see_it_on_home() {
    let service = service();
    let app = app!(service);
    let mut jar: Option<Cookie<'static>> = None;

    let resp = send!(app, jar, signup_request("alice"));
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/home/");

    let resp = send!(
        app,
        jar,
        TestRequest::post()
            .uri("/tweets/create/")
            .set_form([("content", "hello")])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = send!(app, jar, TestRequest::get().uri("/home/"));
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("<p>hello</p>"));
    assert!(body.contains("@alice"));
    assert!(body.contains("Welcome, alice!"));
}

#[actix_web::test]
async fn pages_behind_login_redirect_to_signin() {
    let service = service();
    let app = app!(service);
    let mut jar: Option<Cookie<'static>> = None;

    for uri in ["/home/", "/tweets/create/", "/alice/following_list/"] {
        let resp = send!(app, jar, TestRequest::get().uri(uri));
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&resp), "/signin/");
    }

    let resp = send!(app, jar, TestRequest::get().uri("/"));
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn signin_and_signout() {
    let service = service();
    let app = app!(service);
    let mut jar: Option<Cookie<'static>> = None;
    send!(app, jar, signup_request("alice"));
    send!(app, jar, TestRequest::post().uri("/signout/"));

    let resp = send!(app, jar, TestRequest::get().uri("/home/"));
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let resp = send!(
        app,
        jar,
        TestRequest::post()
            .uri("/signin/")
            .set_form([("username", "alice"), ("password", "wrong-password")])
    );
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = send!(
        app,
        jar,
        TestRequest::post()
            .uri("/signin/")
            .set_form([("username", "alice"), ("password", "s3cret-pass")])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let resp = send!(app, jar, TestRequest::get().uri("/home/"));
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn follow_rules_surface_as_warnings() {
    let service = service();
    let app = app!(service);
    let mut bob_jar: Option<Cookie<'static>> = None;
    let mut alice_jar: Option<Cookie<'static>> = None;
    send!(app, bob_jar, signup_request("bob"));
    send!(app, alice_jar, signup_request("alice"));

    let resp = send!(app, alice_jar, TestRequest::post().uri("/alice/follow/"));
    assert_eq!(location(&resp), "/home/");
    let body = body_text(send!(app, alice_jar, TestRequest::get().uri("/home/"))).await;
    assert!(body.contains("You cannot follow yourself."));

    send!(app, alice_jar, TestRequest::post().uri("/bob/follow/"));
    send!(app, alice_jar, TestRequest::post().uri("/bob/follow/"));
    let body = body_text(send!(app, alice_jar, TestRequest::get().uri("/home/"))).await;
    assert!(body.contains("You are already following bob."));

    let body = body_text(send!(
        app,
        alice_jar,
        TestRequest::get().uri("/bob/follower_list/")
    ))
    .await;
    assert!(body.contains("@alice"));

    send!(app, alice_jar, TestRequest::post().uri("/bob/unfollow/"));
    send!(app, alice_jar, TestRequest::post().uri("/bob/unfollow/"));
    let body = body_text(send!(app, alice_jar, TestRequest::get().uri("/home/"))).await;
    assert!(body.contains("Invalid operation."));

    send!(app, alice_jar, TestRequest::post().uri("/nobody/follow/"));
    let body = body_text(send!(app, alice_jar, TestRequest::get().uri("/home/"))).await;
    assert!(body.contains("User nobody does not exist"));
}

#[actix_web::test]
async fn only_the_author_deletes_a_tweet() {
    let service = service();
    let app = app!(service);
    let mut alice_jar: Option<Cookie<'static>> = None;
    let mut bob_jar: Option<Cookie<'static>> = None;
    send!(app, alice_jar, signup_request("alice"));
    send!(app, bob_jar, signup_request("bob"));

    let alice = service.user_by_username("alice").await.unwrap();
    let tweet_id = service.create_tweet(alice.user_id, "mine").await.unwrap();
    let delete = format!("/tweets/{tweet_id}/delete/");

    let resp = send!(app, bob_jar, TestRequest::post().uri(&delete));
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = send!(
        app,
        bob_jar,
        TestRequest::get().uri(&format!("/tweets/{tweet_id}/"))
    );
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = send!(app, alice_jar, TestRequest::post().uri(&delete));
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let resp = send!(
        app,
        alice_jar,
        TestRequest::get().uri(&format!("/tweets/{tweet_id}/"))
    );
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = send!(
        app,
        alice_jar,
        TestRequest::get().uri(&format!("/tweets/{}/", Uuid::new_v4()))
    );
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn like_and_unlike_toggle_the_button() {
    let service = service();
    let app = app!(service);
    let mut jar: Option<Cookie<'static>> = None;
    send!(app, jar, signup_request("alice"));
    let alice = service.user_by_username("alice").await.unwrap();
    let tweet_id = service.create_tweet(alice.user_id, "hello").await.unwrap();

    let resp = send!(
        app,
        jar,
        TestRequest::post().uri(&format!("/tweets/{tweet_id}/like/"))
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let body = body_text(send!(app, jar, TestRequest::get().uri("/home/"))).await;
    assert!(body.contains(&format!("/tweets/{tweet_id}/unlike/")));

    send!(
        app,
        jar,
        TestRequest::get().uri(&format!("/tweets/{tweet_id}/unlike/"))
    );
    let body = body_text(send!(app, jar, TestRequest::get().uri("/home/"))).await;
    assert!(body.contains(&format!("/tweets/{tweet_id}/like/")));
    assert!(!body.contains(&format!("/tweets/{tweet_id}/unlike/")));
}

#[actix_web::test]
async fn profile_edit_requires_ownership() {
    let service = service();
    let app = app!(service);
    let mut alice_jar: Option<Cookie<'static>> = None;
    let mut bob_jar: Option<Cookie<'static>> = None;
    send!(app, alice_jar, signup_request("alice"));
    send!(app, bob_jar, signup_request("bob"));
    let alice = service.user_by_username("alice").await.unwrap();
    let edit = format!("/profile/edit/{}/", alice.profile_id);
    let form = [("display_name", "Alice"), ("bio", "<b>hi</b>")];

    let resp = send!(app, bob_jar, TestRequest::post().uri(&edit).set_form(form));
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send!(app, alice_jar, TestRequest::post().uri(&edit).set_form(form));
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("/profile/{}/", alice.profile_id));

    let body = body_text(send!(
        app,
        bob_jar,
        TestRequest::get().uri(&format!("/profile/{}/", alice.profile_id))
    ))
    .await;
    assert!(body.contains("&lt;b&gt;hi&lt;/b&gt;"));
    assert!(body.contains("/alice/follow/"));

    let resp = send!(
        app,
        alice_jar,
        TestRequest::get().uri(&format!("/profile/{}/", Uuid::new_v4()))
    );
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn invalid_tweet_content_is_flashed_back_to_the_form() {
    let service = service();
    let app = app!(service);
    let mut jar: Option<Cookie<'static>> = None;
    send!(app, jar, signup_request("alice"));
    send!(app, jar, TestRequest::get().uri("/home/"));

    let too_long = "x".repeat(141);
    for content in ["", too_long.as_str()] {
        let resp = send!(
            app,
            jar,
            TestRequest::post()
                .uri("/tweets/create/")
                .set_form([("content", content)])
        );
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&resp), "/tweets/create/");

        let body = body_text(send!(app, jar, TestRequest::get().uri("/tweets/create/"))).await;
        assert!(body.contains("A tweet must be between 1 and 140 characters."));
    }

    let body = body_text(send!(app, jar, TestRequest::get().uri("/home/"))).await;
    assert!(!body.contains(&too_long));
}

#[actix_web::test]
async fn profile_edit_rerenders_out_of_range_fields() {
    let service = service();
    let app = app!(service);
    let mut jar: Option<Cookie<'static>> = None;
    send!(app, jar, signup_request("alice"));
    let alice = service.user_by_username("alice").await.unwrap();
    let edit = format!("/profile/edit/{}/", alice.profile_id);

    let resp = send!(
        app,
        jar,
        TestRequest::post()
            .uri(&edit)
            .set_form([("display_name", ""), ("bio", "still here")])
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_text(resp).await;
    assert!(body.contains("Display name must be between 1 and 50 characters."));
    assert!(body.contains("still here"));

    let long_bio = "b".repeat(161);
    let resp = send!(
        app,
        jar,
        TestRequest::post()
            .uri(&edit)
            .set_form([("display_name", "Alice"), ("bio", long_bio.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(resp)
        .await
        .contains("Bio must be between 0 and 160 characters."));

    let profile = service
        .owned_profile(alice.profile_id, alice.user_id)
        .await
        .unwrap();
    assert_eq!(profile.display_name, "alice");
    assert!(profile.bio.is_empty());
}
