//! services/web/src/bin/openapi.rs
//!
//! Generates the OpenAPI document describing the site's pages and form
//! endpoints. Writes `openapi.json` unless another path is given.

use utoipa::OpenApi;
use web_lib::web::ApiDoc;

/// Serializes the document and writes it to `path`.
fn generate_spec(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    println!("OpenAPI document written to {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    generate_spec(ApiDoc::openapi(), &path)?;
    Ok(())
}
