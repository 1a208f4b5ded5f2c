pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod render;
pub mod service;
pub mod store;

use actix_web::web;

use crate::handlers::{accounts, tweets};

/// Register every route. Fixed paths come first so that `/{username}/...`
/// only sees what is left over.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(accounts::welcome)
        .service(accounts::signup_page)
        .service(accounts::signup)
        .service(accounts::signin_page)
        .service(accounts::signin)
        .service(accounts::signout)
        .service(accounts::home)
        .service(accounts::user_profile)
        .service(accounts::profile_edit_page)
        .service(accounts::profile_edit)
        .service(tweets::create_page)
        .service(tweets::create_tweet)
        .service(tweets::tweet_detail)
        .service(tweets::delete_page)
        .service(tweets::delete_tweet)
        .service(tweets::like_tweet)
        .service(tweets::unlike_tweet)
        .service(accounts::following_list)
        .service(accounts::follower_list)
        .service(accounts::follow)
        .service(accounts::unfollow);
}
