//! services/admin/src/bin/openapi.rs
//!
//! Writes the OpenAPI 3.0 document for the admin service to `openapi.json`,
//! or to the path given as the first argument.

use admin_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn write_document(api_doc: utoipa::openapi::OpenApi, path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let document = api_doc.to_pretty_json()?;
    std::fs::write(path, document)?;
    println!("OpenAPI document written to {}", path);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    write_document(ApiDoc::openapi(), &path)
}
