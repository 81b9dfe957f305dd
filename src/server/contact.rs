use askama::Template;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::Serialize;
use tokio::task::spawn_blocking;

use crate::{
    contact::{Contact, ContactId},
    server::{
        flash::Flash,
        form::{ContactForm, FormErrors},
        parse_id, render, Accept, ServerError,
    },
    store::Contacts,
};

pub async fn list(
    accept: Accept,
    State(contacts): State<&'static Contacts>,
    jar: SignedCookieJar,
) -> Result<Response, ServerError> {
    let contacts = spawn_blocking(move || contacts.find_all()).await?;

    tracing::debug!("Listing {} contacts", contacts.len());

    let (jar, flash) = match accept {
        Accept::Json => (jar, None),
        Accept::Unspecified | Accept::Html => Flash::take_from(jar),
    };

    let page = ContactsPage { contacts, flash };

    Ok((jar, accept.into_response(page)?).into_response())
}

pub async fn create_form() -> Result<Html<String>, ServerError> {
    render(&FormPage {
        id: None,
        form: ContactForm::default(),
        errors: FormErrors::default(),
    })
}

pub async fn create(
    State(contacts): State<&'static Contacts>,
    jar: SignedCookieJar,
    Form(form): Form<ContactForm>,
) -> Result<Response, ServerError> {
    let mut contact = match form.validate(None) {
        Ok(contact) => contact,
        Err(errors) => return invalid(None, form, errors),
    };

    let id = spawn_blocking(move || contacts.persist(&mut contact)).await??;

    tracing::info!("Created contact {}", id);

    Ok(redirect(jar, Flash::Created))
}

pub async fn edit_form(
    Path(id): Path<String>,
    State(contacts): State<&'static Contacts>,
) -> Result<Html<String>, ServerError> {
    let (id, contact) = find(&id, contacts).await?;

    render(&FormPage {
        id: Some(id),
        form: ContactForm::from(&contact),
        errors: FormErrors::default(),
    })
}

pub async fn edit(
    Path(id): Path<String>,
    State(contacts): State<&'static Contacts>,
    jar: SignedCookieJar,
    Form(form): Form<ContactForm>,
) -> Result<Response, ServerError> {
    let (id, _contact) = find(&id, contacts).await?;

    let mut contact = match form.validate(Some(id)) {
        Ok(contact) => contact,
        Err(errors) => return invalid(Some(id), form, errors),
    };

    spawn_blocking(move || contacts.persist(&mut contact)).await??;

    tracing::info!("Updated contact {}", id);

    Ok(redirect(jar, Flash::Updated))
}

pub async fn delete(
    Path(id): Path<String>,
    State(contacts): State<&'static Contacts>,
    jar: SignedCookieJar,
) -> Result<Response, ServerError> {
    let id = parse_id(&id)?;

    if spawn_blocking(move || contacts.remove(id)).await??.is_none() {
        return Err(ServerError::NotFound("Contact not found"));
    }

    tracing::info!("Deleted contact {}", id);

    Ok(redirect(jar, Flash::Deleted))
}

async fn find(
    id: &str,
    contacts: &'static Contacts,
) -> Result<(ContactId, Contact), ServerError> {
    let id = parse_id(id)?;

    let contact = spawn_blocking(move || contacts.find(id))
        .await?
        .ok_or(ServerError::NotFound("Contact not found"))?;

    Ok((id, contact))
}

fn invalid(
    id: Option<ContactId>,
    form: ContactForm,
    errors: FormErrors,
) -> Result<Response, ServerError> {
    tracing::debug!("Rejecting contact form: {:?}", errors);

    let page = render(&FormPage { id, form, errors })?;

    Ok((StatusCode::UNPROCESSABLE_ENTITY, page).into_response())
}

fn redirect(jar: SignedCookieJar, flash: Flash) -> Response {
    (flash.add_to(jar), Redirect::to("/contact")).into_response()
}

#[derive(Template, Serialize)]
#[template(path = "contacts.html")]
struct ContactsPage {
    contacts: Vec<Contact>,
    #[serde(skip)]
    flash: Option<Flash>,
}

/// Shared by the create and edit pages, the latter having an identifier.
#[derive(Template)]
#[template(path = "contact_form.html")]
struct FormPage {
    id: Option<ContactId>,
    form: ContactForm,
    errors: FormErrors,
}
