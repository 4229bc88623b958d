//! services/api/src/bin/openapi.rs
//!
//! Exports the travel companion's REST contract as an OpenAPI document.
//!
//! Usage: `openapi [PATH]`. Writes to `openapi.json` by default; a path of
//! `-` prints the document to stdout instead.

use companion_api::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_PATH: &str = "openapi.json";

/// Where the rendered document goes.
#[derive(Debug, PartialEq, Eq)]
enum Output {
    Stdout,
    File(String),
}

impl Output {
    fn from_arg(arg: Option<String>) -> Self {
        match arg.as_deref() {
            Some("-") => Self::Stdout,
            Some(path) => Self::File(path.to_string()),
            None => Self::File(DEFAULT_PATH.to_string()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output = Output::from_arg(std::env::args().nth(1));
    let doc = ApiDoc::openapi();
    let json = doc.to_pretty_json()?;

    match output {
        Output::Stdout => println!("{json}"),
        Output::File(path) => {
            std::fs::write(&path, json)?;
            eprintln!(
                "Wrote {} v{} ({} paths) to {path}",
                doc.info.title,
                doc.info.version,
                doc.paths.paths.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_defaults_to_openapi_json() {
        assert_eq!(Output::from_arg(None), Output::File("openapi.json".into()));
        assert_eq!(Output::from_arg(Some("-".into())), Output::Stdout);
        assert_eq!(
            Output::from_arg(Some("docs/api.json".into())),
            Output::File("docs/api.json".into())
        );
    }

    #[test]
    fn document_covers_the_rest_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/preferences",
            "/api/recommendations",
            "/api/context/update",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
