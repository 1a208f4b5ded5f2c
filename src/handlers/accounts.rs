use actix_session::Session;
use actix_web::{get, http::StatusCode, post, web, HttpResponse};
use log::info;
use uuid::Uuid;

use super::{optional_viewer, redirect, viewer, warn_and_redirect};
use crate::auth::{self, flash, take_flashes, CurrentUser, Level};
use crate::error::AppError;
use crate::models::{ProfileEditForm, SigninForm, SignupForm};
use crate::render;
use crate::service::Service;

#[get("/")]
pub async fn welcome(
    service: web::Data<Service>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let viewer = optional_viewer(&service, &session).await?;
    Ok(render::welcome(viewer.as_ref(), &take_flashes(&session)))
}

#[get("/signup/")]
pub async fn signup_page(session: Session) -> HttpResponse {
    render::signup(StatusCode::OK, &take_flashes(&session), None)
}

#[post("/signup/")]
pub async fn signup(
    service: web::Data<Service>,
    session: Session,
    form: web::Form<SignupForm>,
) -> Result<HttpResponse, AppError> {
    match service.signup(&form).await {
        Ok(user) => {
            auth::login(&session, user.user_id)?;
            flash(&session, Level::Success, format!("Welcome, {}!", user.username))?;
            Ok(redirect("/home/"))
        }
        Err(AppError::Validation(e)) => Ok(render::signup(
            StatusCode::BAD_REQUEST,
            &take_flashes(&session),
            Some(&e.to_string()),
        )),
        Err(e) => Err(e),
    }
}

#[get("/signin/")]
pub async fn signin_page(session: Session) -> HttpResponse {
    render::signin(StatusCode::OK, &take_flashes(&session), None)
}

#[post("/signin/")]
pub async fn signin(
    service: web::Data<Service>,
    session: Session,
    form: web::Form<SigninForm>,
) -> Result<HttpResponse, AppError> {
    match service.authenticate(&form.username, &form.password).await {
        Ok(user) => {
            auth::login(&session, user.user_id)?;
            info!("User signed in: {}", user.username);
            Ok(redirect("/home/"))
        }
        Err(e @ AppError::Authentication) => Ok(render::signin(
            StatusCode::UNAUTHORIZED,
            &take_flashes(&session),
            Some(&e.to_string()),
        )),
        Err(e) => Err(e),
    }
}

#[post("/signout/")]
pub async fn signout(session: Session) -> HttpResponse {
    auth::logout(&session);
    redirect("/")
}

#[get("/home/")]
pub async fn home(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    let feed = service.home(viewer).await?;
    Ok(render::home(&feed, &take_flashes(&session)))
}

#[get("/profile/{id}/")]
pub async fn user_profile(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    let page = service.profile_page(path.into_inner(), viewer.user_id).await?;
    Ok(render::profile(&page, &viewer, &take_flashes(&session)))
}

#[get("/profile/edit/{id}/")]
pub async fn profile_edit_page(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    let profile = service
        .owned_profile(path.into_inner(), viewer.user_id)
        .await?;
    Ok(render::profile_edit(
        StatusCode::OK,
        &profile,
        &viewer,
        &take_flashes(&session),
        None,
    ))
}

#[post("/profile/edit/{id}/")]
pub async fn profile_edit(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<Uuid>,
    form: web::Form<ProfileEditForm>,
) -> Result<HttpResponse, AppError> {
    let profile_id = path.into_inner();
    match service.edit_profile(current.0, profile_id, &form).await {
        Ok(profile) => {
            flash(&session, Level::Success, "Profile updated.")?;
            Ok(redirect(&format!("/profile/{}/", profile.profile_id)))
        }
        Err(AppError::Validation(e)) => {
            let viewer = viewer(&service, &session, current).await?;
            let mut profile = service.owned_profile(profile_id, viewer.user_id).await?;
            profile.display_name = form.display_name.clone();
            profile.bio = form.bio.clone();
            Ok(render::profile_edit(
                StatusCode::BAD_REQUEST,
                &profile,
                &viewer,
                &take_flashes(&session),
                Some(&e.to_string()),
            ))
        }
        Err(e) => Err(e),
    }
}

#[get("/{username}/following_list/")]
pub async fn following_list(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    let (user, views) = service.following_list(&path).await?;
    Ok(render::friend_list(
        "Following",
        &user,
        &views,
        &viewer,
        &take_flashes(&session),
    ))
}

#[get("/{username}/follower_list/")]
pub async fn follower_list(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let viewer = viewer(&service, &session, current).await?;
    let (user, views) = service.follower_list(&path).await?;
    Ok(render::friend_list(
        "Followers",
        &user,
        &views,
        &viewer,
        &take_flashes(&session),
    ))
}

#[post("/{username}/follow/")]
pub async fn follow(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    match service.follow(current.0, &path).await {
        Ok(target) => {
            flash(
                &session,
                Level::Success,
                format!("You are now following {}.", target.username),
            )?;
            Ok(redirect("/home/"))
        }
        Err(e) => warn_and_redirect(&session, e, "/home/"),
    }
}

#[post("/{username}/unfollow/")]
pub async fn unfollow(
    service: web::Data<Service>,
    session: Session,
    current: CurrentUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    match service.unfollow(current.0, &path).await {
        Ok(target) => {
            flash(
                &session,
                Level::Success,
                format!("You unfollowed {}.", target.username),
            )?;
            Ok(redirect("/home/"))
        }
        Err(e) => warn_and_redirect(&session, e, "/home/"),
    }
}
