use hyper::header::{HeaderName, HeaderValue};
use hyper::http::request::Parts;
use tracing::{debug, warn};

use super::{
    ConnectionInfo, Director, DirectorError, CONNECTION_ID, HTTP_PROTO, PROTOCOL_DETECTION_ERROR,
    PROTOCOL_HTTP, PROTOCOL_HTTPS, SOURCE_IP, SOURCE_IP_PORT, SOURCE_PORT,
};
use crate::addr::split_host_port;

/// 헤더 값 템플릿
///
/// 설정 값 전체가 예약 토큰과 정확히 일치할 때만 토큰으로 취급합니다.
/// 값 안에 토큰이 섞여 있으면 그대로 리터럴입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderTemplate {
    ConnectionId,
    HttpProto,
    SourceIp,
    SourcePort,
    SourceIpPort,
    Literal(HeaderValue),
}

impl HeaderTemplate {
    pub fn parse(name: &str, value: &str) -> Result<Self, DirectorError> {
        let template = match value {
            CONNECTION_ID => Self::ConnectionId,
            HTTP_PROTO => Self::HttpProto,
            SOURCE_IP => Self::SourceIp,
            SOURCE_PORT => Self::SourcePort,
            SOURCE_IP_PORT => Self::SourceIpPort,
            literal => Self::Literal(HeaderValue::from_str(literal).map_err(|source| {
                DirectorError::InvalidHeaderValue {
                    name: name.to_string(),
                    value: literal.to_string(),
                    source,
                }
            })?),
        };
        Ok(template)
    }

    /// 요청 메타데이터로 값을 계산합니다.
    fn resolve(&self, info: Option<&ConnectionInfo>, host: &str, port: &str) -> Option<HeaderValue> {
        let value = match self {
            Self::Literal(value) => return Some(value.clone()),
            Self::ConnectionId => info.map(|i| i.connection_id.clone()).unwrap_or_default(),
            Self::HttpProto => match info.and_then(|i| i.tls) {
                Some(true) => PROTOCOL_HTTPS.to_string(),
                Some(false) => PROTOCOL_HTTP.to_string(),
                None => PROTOCOL_DETECTION_ERROR.to_string(),
            },
            Self::SourceIp => host.to_string(),
            Self::SourcePort => port.to_string(),
            Self::SourceIpPort => format!("{}:{}", host, port),
        };
        HeaderValue::from_str(&value).ok()
    }
}

/// 설정된 헤더를 요청에 덮어씁니다.
#[derive(Debug, Clone, Default)]
pub struct SetHeaders {
    headers: Vec<(HeaderName, HeaderTemplate)>,
}

impl SetHeaders {
    /// 같은 이름이 여러 번 나오면 마지막 값이 적용됩니다.
    pub fn new<I, K, V>(headers: I) -> Result<Self, DirectorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let headers = headers
            .into_iter()
            .map(|(name, value)| {
                let (name, value) = (name.as_ref(), value.as_ref());
                let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|source| {
                    DirectorError::InvalidHeaderName {
                        name: name.to_string(),
                        source,
                    }
                })?;
                Ok((header_name, HeaderTemplate::parse(name, value)?))
            })
            .collect::<Result<Vec<_>, DirectorError>>()?;

        Ok(Self { headers })
    }
}

impl Director for SetHeaders {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        let info = ConnectionInfo::from_parts(parts).cloned();
        let remote_addr = info.as_ref().map(|i| i.remote_addr.as_str()).unwrap_or("");
        let (host, port) = match split_host_port(remote_addr) {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, remote_addr = %remote_addr, "Parse remote addr for headers");
                ("", "")
            }
        };

        for (name, template) in &self.headers {
            match template.resolve(info.as_ref(), host, port) {
                Some(value) => {
                    parts.headers.insert(name.clone(), value);
                }
                None => warn!(header = %name, "헤더 값을 만들 수 없어 건너뜀"),
            }
        }
        Ok(())
    }
}
