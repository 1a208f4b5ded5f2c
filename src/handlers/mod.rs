pub mod accounts;
pub mod tweets;

use actix_session::Session;
use actix_web::{http::header, HttpResponse};
use log::debug;

use crate::auth::{flash, logout, session_user_id, CurrentUser, Level};
use crate::error::AppError;
use crate::models::User;
use crate::service::Service;

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// Validation and lookup failures become a warning on the next page;
/// anything else is left to the error handler.
pub(crate) fn warn_and_redirect(
    session: &Session,
    err: AppError,
    location: &str,
) -> Result<HttpResponse, AppError> {
    if !err.is_user_facing() {
        return Err(err);
    }
    debug!("Rejected request: {}", err);
    flash(session, Level::Warning, err.to_string())?;
    Ok(redirect(location))
}

/// Load the signed-in user. A session whose account no longer exists is
/// dropped and treated as signed out.
pub(crate) async fn viewer(
    service: &Service,
    session: &Session,
    current: CurrentUser,
) -> Result<User, AppError> {
    match service.user(current.0).await {
        Err(AppError::NotFound(_)) => {
            logout(session);
            Err(AppError::LoginRequired)
        }
        other => other,
    }
}

pub(crate) async fn optional_viewer(
    service: &Service,
    session: &Session,
) -> Result<Option<User>, AppError> {
    match session_user_id(session)? {
        Some(user_id) => match viewer(service, session, CurrentUser(user_id)).await {
            Ok(user) => Ok(Some(user)),
            Err(AppError::LoginRequired) => Ok(None),
            Err(e) => Err(e),
        },
        None => Ok(None),
    }
}
