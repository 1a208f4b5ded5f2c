use actix_session::Session;
use actix_web::{get, post, route, web, HttpResponse};
use uuid::Uuid;

use super::{optional_viewer, redirect, viewer, warn_and_redirect};
use crate::auth::{flash, take_flashes, CurrentUser, Level};
use crate::error::AppError;
use crate::models::CreateTweetForm;
use crate::render;
use crate::service::Service;

#[get("/tweets/create/")]
pub async fn create_page(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    Ok(render::tweet_create(&viewer, &take_flashes(&session)))
}

#[post("/tweets/create/")]
pub async fn create_tweet(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    form: web::Form<CreateTweetForm>,
) -> Result<HttpResponse, AppError> {
    match service.create_tweet(current.0, &form.content).await {
        Ok(_) => Ok(redirect("/home/")),
        Err(e) => warn_and_redirect(&session, e, "/tweets/create/"),
    }
}

#[get("/tweets/{id}/")]
pub async fn tweet_detail(
    service: web::Data<Service>,
    session: Session,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let view = service.tweet_detail(path.into_inner()).await?;
    let viewer = optional_viewer(&service, &session).await?;
    let liked = match &viewer {
        Some(user) => Some(service.has_liked(view.tweet.tweet_id, user.user_id).await?),
        None => None,
    };
    Ok(render::tweet_detail(
        &view,
        viewer.as_ref(),
        liked,
        &take_flashes(&session),
    ))
}

#[get("/tweets/{id}/delete/")]
pub async fn delete_page(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    let tweet = service
        .owned_tweet(path.into_inner(), viewer.user_id)
        .await?;
    Ok(render::tweet_delete(&tweet, &viewer, &take_flashes(&session)))
}

#[post("/tweets/{id}/delete/")]
pub async fn delete_tweet(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    service.delete_tweet(path.into_inner(), current.0).await?;
    flash(&session, Level::Success, "Tweet deleted.")?;
    Ok(redirect("/home/"))
}

#[route("/tweets/{id}/like/", method = "GET", method = "POST")]
pub async fn like_tweet(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    match service.like(path.into_inner(), current.0).await {
        Ok(()) => Ok(redirect("/home/")),
        Err(e) => warn_and_redirect(&session, e, "/home/"),
    }
}

#[route("/tweets/{id}/unlike/", method = "GET", method = "POST")]
pub async fn unlike_tweet(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    match service.unlike(path.into_inner(), current.0).await {
        Ok(()) => Ok(redirect("/home/")),
        Err(e) => warn_and_redirect(&session, e, "/home/"),
    }
}
