pub mod contact;
pub mod flash;
pub mod form;

use std::convert::Infallible;

use anyhow::Error;
use askama::Template;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::ACCEPT, request::Parts, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use axum_extra::extract::cookie::Key;
use serde::Serialize;

use crate::{contact::ContactId, store::Contacts};

#[derive(Clone, FromRef)]
pub struct AppState {
    contacts: &'static Contacts,
    key: Key,
}

pub fn router(contacts: &'static Contacts, key: Key) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/contact", get(contact::list))
        .route("/contact/create", get(contact::create_form).post(contact::create))
        .route("/contact/:id/edit", get(contact::edit_form).post(contact::edit))
        .route("/contact/:id/delete", get(contact::delete).post(contact::delete))
        .with_state(AppState { contacts, key })
}

async fn home() -> Result<Html<String>, ServerError> {
    render(&HomePage)
}

#[derive(Template)]
#[template(path = "home.html")]
struct HomePage;

fn render<P>(page: &P) -> Result<Html<String>, ServerError>
where
    P: Template,
{
    Ok(Html(page.render()?))
}

#[derive(Debug, Clone, Copy)]
pub enum Accept {
    Unspecified,
    Html,
    Json,
}

impl Accept {
    pub fn into_response<P>(self, page: P) -> Result<Response, ServerError>
    where
        P: Template + Serialize,
    {
        let resp = match self {
            Accept::Unspecified | Accept::Html => render(&page)?.into_response(),
            Accept::Json => Json(page).into_response(),
        };

        Ok(resp)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Accept
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(accept) = parts
            .headers
            .get(ACCEPT)
            .and_then(|header| header.to_str().ok())
        {
            if accept.contains("text/html") {
                return Ok(Self::Html);
            } else if accept.contains("application/json") {
                return Ok(Self::Json);
            }
        }

        Ok(Self::Unspecified)
    }
}

fn parse_id(id: &str) -> Result<ContactId, ServerError> {
    id.parse().map_err(|_err| ServerError::NotFound("Contact not found"))
}

pub enum ServerError {
    NotFound(&'static str),
    Internal(Error),
}

impl<E> From<E> for ServerError
where
    Error: From<E>,
{
    fn from(err: E) -> Self {
        Self::Internal(Error::from(err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg).into_response(),
            Self::Internal(err) => {
                tracing::error!("Failed to handle request: {:#}", err);

                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
        }
    }
}
