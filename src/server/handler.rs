use std::convert::Infallible;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioTimer;
use tracing::{debug, error, warn};

use crate::addr::split_host_port;
use crate::director::{ConnectionInfo, Director};
use crate::logging::{log_access, AccessLog};
use crate::proxy::{HttpClient, HttpProxy, TransportError};

pub type ProxyBody = BoxBody<Bytes, hyper::Error>;

/// 속도 제한 키를 정할 수 없을 때 쓰는 값
const UNKNOWN_CLIENT: &str = "unknown";

pub struct RequestHandler {
    proxy: Arc<HttpProxy>,
    client: HttpClient,
}

impl RequestHandler {
    pub fn new(proxy: Arc<HttpProxy>) -> Result<Self, TransportError> {
        let client = proxy.transport.build_client()?;
        Ok(Self { proxy, client })
    }

    pub fn proxy(&self) -> &Arc<HttpProxy> {
        &self.proxy
    }

    /// 활성 디렉터 체인으로 요청을 재작성하고 업스트림으로 전달합니다.
    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> Result<Response<ProxyBody>, Infallible> {
        let start_time = Instant::now();
        let (mut parts, body) = req.into_parts();
        let mut log = AccessLog::from_request(&parts);

        // 요청 처리 중 설정이 교체되어도 같은 체인을 사용
        let chain = self.proxy.director();

        let response = match chain.direct(&mut parts) {
            Err(e) => {
                error!(error = %e, "디렉터 체인 실패");
                log.with_error(&e);
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
            }
            Ok(()) => {
                log.with_destination(&parts);
                let key = client_key(&parts);
                match self
                    .proxy
                    .transport
                    .round_trip(&self.client, parts, body, &key)
                    .await
                {
                    Ok(response) => response.map(BoxBody::new),
                    Err(e @ TransportError::RateLimited { .. }) => {
                        warn!(error = %e, "요청 거부");
                        log.with_error(&e);
                        error_response(StatusCode::TOO_MANY_REQUESTS, "Too Many Requests")
                    }
                    Err(e) => {
                        error!(error = %e, "프록시 요청 실패");
                        log.with_error(&e);
                        error_response(StatusCode::BAD_GATEWAY, "Bad Gateway")
                    }
                }
            }
        };

        if self.proxy.enable_access_log {
            log.with_response(response.status());
            log.duration_ms = start_time.elapsed().as_millis() as u64;
            log_access(&log);
        }

        Ok(response)
    }

    /// 연결 하나를 처리합니다. 모든 요청에 `info`가 첨부됩니다.
    pub async fn handle_connection<I>(
        &self,
        io: I,
        info: ConnectionInfo,
    ) -> Result<(), hyper::Error>
    where
        I: hyper::rt::Read + hyper::rt::Write + Send + Unpin + 'static,
    {
        let mut builder = http1::Builder::new();
        builder.timer(TokioTimer::new());
        builder.header_read_timeout(idle_limit(self.proxy.idle_timeout));

        debug!(connection_id = %info.connection_id, remote_addr = %info.remote_addr, "연결 수락");
        builder
            .serve_connection(
                io,
                service_fn(|mut req: Request<Incoming>| {
                    req.extensions_mut().insert(info.clone());
                    self.handle_request(req)
                }),
            )
            .await
    }
}

/// 원격 주소의 정규화된 IP
fn client_key(parts: &hyper::http::request::Parts) -> String {
    ConnectionInfo::from_parts(parts)
        .and_then(|info| split_host_port(&info.remote_addr).ok())
        .and_then(|(host, _)| host.parse::<IpAddr>().ok())
        .map(|ip| ip.to_canonical().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// 0이면 유휴 제한 없음
fn idle_limit(timeout: Duration) -> Option<Duration> {
    (!timeout.is_zero()).then_some(timeout)
}

fn error_response(status: StatusCode, message: &'static str) -> Response<ProxyBody> {
    let body = Full::new(Bytes::from_static(message.as_bytes()))
        .map_err(|never: Infallible| match never {})
        .boxed();
    let mut response = Response::new(body);
    *response.status_mut() = status;
    response
}
