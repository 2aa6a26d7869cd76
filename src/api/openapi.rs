//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the minimal Newznab-style API stub
//! using utoipa for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the ingest core's minimal API stub.
///
/// The spec can be accessed via:
/// - `/api/v1/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "nzbidx-ingest API",
        version = "0.1.0",
        description = "Minimal Newznab-style surface over the release/cursor store: health, getnzb, search",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:6789/api/v1", description = "Local development server")
    ),
    paths(
        crate::api::routes::health_check,
        crate::api::routes::search,
        crate::api::routes::get_nzb,
    ),
    components(schemas(
        crate::api::routes::SearchQuery,
        crate::api::routes::SearchResultItem,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "system", description = "Health and service metadata"),
        (name = "search", description = "Newznab-style search backed by the local release store"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Query(
                        utoipa::openapi::security::ApiKeyValue::new("apikey"),
                    ),
                ),
            );
        }
    }
}
