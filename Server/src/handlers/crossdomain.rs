// handlers/crossdomain.rs

use axum::{http::{header, StatusCode}, response::{IntoResponse, Response}};

const CROSSDOMAIN_POLICY: &str = r#"<cross-domain-policy>
<site-control permitted-cross-domain-policies="all"/>
<allow-access-from domain="*" secure="false"/>
<allow-http-request-headers-from domain="*" headers="*" secure="false"/>
</cross-domain-policy>"#;

/// Flash-era cross-domain policy, still requested by some legacy players.
pub async fn fetch_crossdomain() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml")],
        CROSSDOMAIN_POLICY,
    )
        .into_response()
}
