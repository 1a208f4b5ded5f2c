//! Credentials, sessions and one-shot flash messages.

use std::future::{ready, Ready};

use actix_session::{
    config::CookieContentSecurity, storage::CookieSessionStore, Session, SessionExt,
    SessionMiddleware,
};
use actix_web::{cookie::Key, dev::Payload, FromRequest, HttpRequest};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const SESSION_COOKIE: &str = "twitter_session";
const USER_ID_KEY: &str = "user_id";
const FLASH_KEY: &str = "_messages";

pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    Ok(bcrypt::hash(password, cost)?)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    Ok(bcrypt::verify(password, password_hash)?)
}

/// Signed cookie sessions; the payload is readable but tamper-proof.
pub fn session_middleware(key: Key, secure: bool) -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name(SESSION_COOKIE.to_string())
        .cookie_content_security(CookieContentSecurity::Signed)
        .cookie_secure(secure)
        .build()
}

pub fn login(session: &Session, user_id: Uuid) -> Result<(), AppError> {
    session.renew();
    session.insert(USER_ID_KEY, user_id)?;
    Ok(())
}

pub fn logout(session: &Session) {
    session.purge();
}

pub fn session_user_id(session: &Session) -> Result<Option<Uuid>, AppError> {
    Ok(session.get::<Uuid>(USER_ID_KEY)?)
}

/// The signed-in user's id. Extraction fails with [`AppError::LoginRequired`]
/// when the request carries no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub Uuid);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let session = req.get_session();
        ready(match session_user_id(&session) {
            Ok(Some(user_id)) => Ok(CurrentUser(user_id)),
            Ok(None) => Err(AppError::LoginRequired),
            Err(e) => Err(e),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Success,
    Warning,
}

impl Level {
    pub fn css_class(self) -> &'static str {
        match self {
            Level::Success => "success",
            Level::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

/// Queue a message for the next rendered page.
pub fn flash(session: &Session, level: Level, text: impl Into<String>) -> Result<(), AppError> {
    let mut messages = session
        .get::<Vec<FlashMessage>>(FLASH_KEY)?
        .unwrap_or_default();
    messages.push(FlashMessage {
        level,
        text: text.into(),
    });
    session.insert(FLASH_KEY, messages)?;
    Ok(())
}

pub fn take_flashes(session: &Session) -> Vec<FlashMessage> {
    session
        .remove_as::<Vec<FlashMessage>>(FLASH_KEY)
        .and_then(Result::ok)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let hashed = hash_password("correct horse", 4).unwrap();
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }
}
