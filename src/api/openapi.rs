//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the kgm2flac REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the kgm2flac REST API
///
/// The spec can be accessed via `/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "kgm2flac REST API",
        version = "0.2.0",
        description = "Batch conversion of KGM/KGMA/VPR encrypted audio into FLAC",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    paths(
        crate::api::routes::convert,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "convert", description = "Audio conversion"),
        (name = "system", description = "Health and documentation")
    )
)]
pub struct ApiDoc;
