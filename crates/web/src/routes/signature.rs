//! Profile and signature pages for signed-in users.

use std::sync::Arc;

use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tracing::debug;

use mailsig_core::format_signature;

use crate::pages;
use crate::session::CurrentUser;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/generate", get(generate))
}

async fn index(CurrentUser(user): CurrentUser) -> Html<String> {
    pages::index_page(&user)
}

async fn generate(CurrentUser(user): CurrentUser) -> Html<String> {
    let signature = format_signature(&user);
    debug!(lines = signature.lines().len(), "generated signature");
    pages::signature_page(&user, &signature.render())
}
