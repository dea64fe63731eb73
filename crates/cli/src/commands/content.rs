//! Read-only commands: show, validate, gallery.

use artistic_gurl_admin::{ContentStore, EditSession};
use artistic_gurl_core::{GalleryFilter, Product, Violation};
use serde_json::json;

use super::{CommandError, Context};

/// Print the document and the token it was read at.
///
/// # Errors
///
/// Returns the credential or store error.
pub async fn show<S: ContentStore>(ctx: &Context<S>) -> Result<(), CommandError> {
    let (session, _) = ctx.hydrated().await?;
    print_json(&snapshot_json(&session)?);
    Ok(())
}

fn snapshot_json(session: &EditSession) -> Result<serde_json::Value, CommandError> {
    Ok(json!({
        "token": session.token(),
        "document": serde_json::to_value(session.document())?,
    }))
}

/// Print validation findings.
///
/// # Errors
///
/// [`CommandError::Invalid`] if any finding is an error (warnings pass).
pub async fn validate<S: ContentStore>(ctx: &Context<S>) -> Result<(), CommandError> {
    let (session, _) = ctx.hydrated().await?;
    let findings = session.findings();
    report_findings(&findings);
    match findings.iter().filter(|f| !f.is_warning()).count() {
        0 => Ok(()),
        errors => Err(CommandError::Invalid(errors)),
    }
}

#[allow(clippy::print_stdout)]
fn report_findings(findings: &[Violation]) {
    if findings.is_empty() {
        println!("No problems found");
        return;
    }
    for finding in findings {
        let label = if finding.is_warning() { "warning" } else { "error" };
        println!("{label}: {finding}");
    }
}

/// Print the gallery tabs and the products the filter selects.
///
/// # Errors
///
/// Returns the credential or store error.
pub async fn gallery<S: ContentStore>(
    ctx: &Context<S>,
    category: Option<String>,
    search: Option<String>,
) -> Result<(), CommandError> {
    let (session, _) = ctx.hydrated().await?;
    let filter = gallery_filter(category, search);
    if let Some(document) = session.document() {
        print_json(&json!({
            "categories": document.gallery_categories(),
            "products": document.filter_products(&filter),
        }));
    }
    Ok(())
}

fn gallery_filter(category: Option<String>, search: Option<String>) -> GalleryFilter {
    GalleryFilter {
        category: category.unwrap_or_default().into(),
        search,
    }
}

/// Print one product.
pub fn print_product(product: &Product) {
    print_json(&json!(product));
}

#[allow(clippy::print_stdout)]
pub fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => tracing::error!(error = %e, "Failed to format output"),
    }
}
