use axum::{
    extract::{FromRequestParts, MatchedPath, Path as AxumPath, State},
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
    body::Body,
    Form,
};
use log::{debug, info, warn};
use serde::Deserialize;
use std::io;

use crate::components::Page;
use crate::errors::WikiError;
use crate::services::StoreError;
use crate::title::Title;
use crate::types::{AppState, Article, PageContext};
use crate::utils::{content_type_for, ensure_safe_path, normalize_path};

/// Title taken from the rest of the request path, already validated.
///
/// Extraction fails with [`WikiError::InvalidTitle`] (a 404) before the handler
/// body runs, so handlers never see a title that could reach storage unchecked.
#[derive(Debug, Clone)]
pub struct ValidTitle(pub Title);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for ValidTitle
where
    S: Send + Sync,
{
    type Rejection = WikiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AxumPath(raw) = AxumPath::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| WikiError::InvalidTitle)?;
        match Title::parse(&raw) {
            Some(title) => Ok(ValidTitle(title)),
            None => {
                debug!("Rejected title {:?} on {}", raw, parts.uri.path());
                Err(WikiError::InvalidTitle)
            }
        }
    }
}

/// Submitted edit form
#[derive(Debug, Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    pub body: String,
}

/// `302 Found` pointing at `location`
fn found(location: String) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

/// Handle root path requests: report how many articles exist
pub async fn handle_index(State(state): State<AppState>) -> Result<Response, WikiError> {
    let count = state.store.count().await?;
    info!("Index request, {} articles", count);
    let page = state.composer.render_page(Page::Index, &PageContext::Count(count))?;
    Ok(Html(page).into_response())
}

/// Render an article, or send the reader to the editor if it does not exist yet
pub async fn handle_view(
    State(state): State<AppState>,
    ValidTitle(title): ValidTitle,
) -> Result<Response, WikiError> {
    info!("View request for '{}'", title);

    let article = match state.store.load(title.as_str()).await {
        Ok(article) => article,
        Err(StoreError::NotFound) => {
            debug!("'{}' does not exist yet, redirecting to editor", title);
            return Ok(found(format!("/edit/{}", title)));
        }
        Err(e) => return Err(e.into()),
    };

    let html = state.markdown.render(&article.body);
    let page = state.composer.render_page(Page::View, &PageContext::rendered(article.title, html))?;
    Ok(Html(page).into_response())
}

/// Show the edit form with the article's markdown source
pub async fn handle_edit(
    State(state): State<AppState>,
    ValidTitle(title): ValidTitle,
) -> Result<Response, WikiError> {
    info!("Edit request for '{}'", title);

    let article = match state.store.load(title.as_str()).await {
        Ok(article) => article,
        Err(StoreError::NotFound) => Article::blank(title.as_str()),
        Err(e) => {
            warn!("Could not load '{}' for editing, starting blank: {}", title, e);
            Article::blank(title.as_str())
        }
    };

    let page = state.composer.render_page(Page::Edit, &PageContext::source(article))?;
    Ok(Html(page).into_response())
}

/// Persist the submitted body and show the result
pub async fn handle_save(
    State(state): State<AppState>,
    ValidTitle(title): ValidTitle,
    Form(form): Form<SaveForm>,
) -> Result<Response, WikiError> {
    info!("Save request for '{}', {} bytes", title, form.body.len());
    state.store.save(title.as_str(), &form.body).await?;
    Ok(found(format!("/view/{}", title)))
}

/// Serve files under the `css`, `js`, `font` and `img` asset trees
pub async fn handle_asset(
    State(state): State<AppState>,
    matched: MatchedPath,
    AxumPath(path): AxumPath<String>,
) -> Result<Response, WikiError> {
    let prefix = matched
        .as_str()
        .trim_start_matches('/')
        .split('/')
        .next()
        .unwrap_or_default();
    let normalized = normalize_path(&path);
    ensure_safe_path(&normalized)?;
    if normalized.is_empty() {
        return Err(WikiError::NotFound);
    }

    let requested = state.asset_dir.join(prefix).join(&normalized);
    debug!("Asset request for {:?}", requested);

    let bytes = match tokio::fs::read(&requested).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(WikiError::NotFound),
        Err(e) => {
            return match tokio::fs::metadata(&requested).await {
                Ok(meta) if meta.is_dir() => Err(WikiError::NotFound),
                _ => Err(WikiError::Io(e)),
            };
        }
    };

    let content_type = content_type_for(&requested);
    let mut resp = Response::new(Body::from(bytes));
    resp.headers_mut().insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    Ok(resp)
}

/// Anything no route claims
pub async fn handle_not_found() -> WikiError {
    WikiError::NotFound
}
