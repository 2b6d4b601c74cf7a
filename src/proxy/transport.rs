use std::sync::Arc;

use hyper::body::Incoming;
use hyper::header::{self, HeaderMap, HeaderName};
use hyper::http::request::Parts;
use hyper::http::uri::{PathAndQuery, Scheme};
use hyper::{Request, Response, Uri};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use rustls::{ClientConfig, RootCertStore};
use tracing::{debug, warn};

use super::tls::NoVerifier;
use crate::director::Destination;
use crate::rate_limit::AdmissionControl;

pub type HttpClient = Client<HttpsConnector<HttpConnector>, Incoming>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("디렉터가 목적지 호스트를 정하지 않음")]
    MissingDestination,

    #[error("업스트림 URI 생성 실패 {host}: {source}")]
    InvalidUri {
        host: String,
        #[source]
        source: hyper::http::Error,
    },

    #[error("요청 한도 초과: {client}")]
    RateLimited { client: String },

    #[error("업스트림 요청 실패: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),

    #[error("TLS 설정 오류: {0}")]
    Tls(#[from] rustls::Error),

    #[error("시스템 루트 인증서 로드 실패: {0}")]
    NativeRoots(#[source] std::io::Error),
}

/// 홉 단위 헤더. 업스트림으로 전달하지 않습니다.
static HOP_HEADERS: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// 디렉터가 정한 목적지로 요청을 전달합니다.
#[derive(Clone, Default)]
pub struct Transport {
    pub https_backend: bool,
    pub ignore_https_certificate: bool,
    pub rate_limiter: Option<Arc<dyn AdmissionControl>>,
}

impl Transport {
    /// 업스트림 클라이언트를 만듭니다.
    ///
    /// HTTPS 백엔드가 아니면 TLS는 쓰이지 않으므로 빈 루트 저장소로 충분합니다.
    pub fn build_client(&self) -> Result<HttpClient, TransportError> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let builder = hyper_rustls::HttpsConnectorBuilder::new();

        let builder = if self.ignore_https_certificate {
            warn!("백엔드 인증서 검증 비활성화");
            let config = ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoVerifier))
                .with_no_client_auth();
            builder.with_tls_config(config)
        } else if self.https_backend {
            builder
                .with_provider_and_native_roots(provider)
                .map_err(TransportError::NativeRoots)?
        } else {
            let config = ClientConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()?
                .with_root_certificates(RootCertStore::empty())
                .with_no_client_auth();
            builder.with_tls_config(config)
        };

        let connector = builder.https_or_http().enable_http1().wrap_connector(http);
        Ok(Client::builder(TokioExecutor::new()).build(connector))
    }

    /// 승인 제어를 거쳐 요청을 업스트림으로 보냅니다.
    ///
    /// `client_key`는 속도 제한의 기준이 되는 클라이언트 식별자입니다.
    pub async fn round_trip(
        &self,
        client: &HttpClient,
        mut parts: Parts,
        body: Incoming,
        client_key: &str,
    ) -> Result<Response<Incoming>, TransportError> {
        if let Some(limiter) = &self.rate_limiter {
            if !limiter.admit(client_key).await {
                return Err(TransportError::RateLimited {
                    client: client_key.to_string(),
                });
            }
        }

        parts.uri = upstream_uri(&parts)?;
        remove_hop_headers(&mut parts.headers);
        debug!(uri = %parts.uri, "Forward request");

        let response = client.request(Request::from_parts(parts, body)).await?;
        Ok(response)
    }
}

fn upstream_uri(parts: &Parts) -> Result<Uri, TransportError> {
    let destination = Destination::from_parts(parts).ok_or(TransportError::MissingDestination)?;
    let host = destination
        .host
        .as_deref()
        .ok_or(TransportError::MissingDestination)?;
    let scheme = destination.scheme.clone().unwrap_or(Scheme::HTTP);
    let path = parts
        .uri
        .path_and_query()
        .cloned()
        .unwrap_or_else(|| PathAndQuery::from_static("/"));

    Uri::builder()
        .scheme(scheme)
        .authority(host)
        .path_and_query(path)
        .build()
        .map_err(|source| TransportError::InvalidUri {
            host: host.to_string(),
            source,
        })
}

fn remove_hop_headers(headers: &mut HeaderMap) {
    // Connection 헤더에 나열된 헤더도 홉 단위
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();
    for name in listed.iter().chain(HOP_HEADERS.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("https_backend", &self.https_backend)
            .field("ignore_https_certificate", &self.ignore_https_certificate)
            .field("rate_limiter", &self.rate_limiter.is_some())
            .finish()
    }
}
