use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use log::error;
use thiserror::Error;

use crate::render;
use crate::store::StoreError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You cannot follow yourself.")]
    SelfFollow,

    #[error("You cannot unfollow yourself.")]
    SelfUnfollow,

    #[error("You are already following {0}.")]
    AlreadyFollowing(String),

    #[error("Invalid operation.")]
    NotFollowing,

    #[error("A tweet must be between 1 and {max} characters.")]
    ContentLength { max: usize },

    #[error("The username {0} is already taken.")]
    UsernameTaken(String),

    #[error("Usernames are 1 to 150 ASCII letters, digits and @.+-_ characters, not only dots.")]
    InvalidUsername,

    #[error("The username {0} is reserved.")]
    ReservedUsername(String),

    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("Passwords must be at least {min} characters.")]
    PasswordTooShort { min: usize },

    #[error("The two password fields didn't match.")]
    PasswordMismatch,

    #[error("{field} must be between {min} and {max} characters.")]
    FieldLength {
        field: &'static str,
        min: usize,
        max: usize,
    },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("You do not have permission to do that.")]
    Forbidden,

    #[error("Please enter a correct username and password.")]
    Authentication,

    #[error("Please sign in to see this page.")]
    LoginRequired,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("session error: {0}")]
    Session(String),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Errors a handler may turn into a flashed warning instead of an error page.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_) | AppError::NotFound(_) | AppError::Authentication
        )
    }
}

impl From<actix_session::SessionInsertError> for AppError {
    fn from(e: actix_session::SessionInsertError) -> Self {
        AppError::Session(e.to_string())
    }
}

impl From<actix_session::SessionGetError> for AppError {
    fn from(e: actix_session::SessionGetError) -> Self {
        AppError::Session(e.to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Authentication => StatusCode::UNAUTHORIZED,
            AppError::LoginRequired => StatusCode::SEE_OTHER,
            AppError::Store(_) | AppError::Hash(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if let AppError::LoginRequired = self {
            return HttpResponse::SeeOther()
                .insert_header((header::LOCATION, "/signin/"))
                .finish();
        }
        if status.is_server_error() {
            error!("Request failed: {:?}", self);
            return render::error_page(status, "Something went wrong on our side.");
        }
        render::error_page(status, &self.to_string())
    }
}
