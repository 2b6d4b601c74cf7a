use std::path::Path;

use hyper::http::request::Parts;
use tracing::{error, info, span, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::director::{ConnectionInfo, Destination};
use crate::settings::logging::{LogFormat, LogOutput};
use crate::settings::LogSettings;

/// 전역 tracing 구독자를 설치합니다.
///
/// 반환된 가드가 살아 있는 동안만 비동기 writer가 로그를 내보냅니다.
/// `RUST_LOG`가 있으면 설정된 레벨보다 우선합니다.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.level.as_str().to_lowercase()));

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("proxy.log"));
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name))
        }
    };

    let registry = tracing_subscriber::registry().with(filter);
    let result = match settings.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(writer).with_target(true))
            .try_init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init(),
    };
    if let Err(e) = result {
        eprintln!("로깅 초기화 실패: {}", e);
    }

    guard
}

/// 요청 하나의 접근 로그
#[derive(Debug, Default)]
pub struct AccessLog {
    pub connection_id: String,
    pub remote_addr: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub destination: Option<String>,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl AccessLog {
    /// 디렉터 적용 전 요청 헤드로 기록을 시작합니다.
    pub fn from_request(parts: &Parts) -> Self {
        let info = ConnectionInfo::from_parts(parts);
        Self {
            connection_id: info.map(|i| i.connection_id.clone()).unwrap_or_default(),
            remote_addr: info.map(|i| i.remote_addr.clone()).unwrap_or_default(),
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            host: parts
                .headers
                .get(hyper::header::HOST)
                .and_then(|h| h.to_str().ok())
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        }
    }

    /// 디렉터가 정한 목적지를 기록합니다.
    pub fn with_destination(&mut self, parts: &Parts) {
        self.destination = Destination::from_parts(parts).map(|d| {
            let scheme = d.scheme.as_ref().map(|s| s.as_str()).unwrap_or("http");
            format!("{}://{}", scheme, d.host.as_deref().unwrap_or_default())
        });
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }
}

pub fn log_access(log: &AccessLog) {
    let level = if log.error.is_some() {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "access",
        connection_id = %log.connection_id,
        remote_addr = %log.remote_addr,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(
            destination = ?log.destination,
            error = ?log.error,
            "Request failed"
        ),
        Level::WARN => warn!(destination = ?log.destination, "Request completed with warning"),
        _ => info!(destination = ?log.destination, "Request completed"),
    }
}
