#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    /// 리스너가 요청에 연결 정보를 첨부하지 않음
    #[error("요청에 연결 정보가 없음")]
    MissingConnectionInfo,

    #[error("유효하지 않은 헤더 이름 {name}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: hyper::header::InvalidHeaderName,
    },

    #[error("헤더 {name}의 값 {value}이(가) 유효하지 않음: {source}")]
    InvalidHeaderValue {
        name: String,
        value: String,
        #[source]
        source: hyper::header::InvalidHeaderValue,
    },

    #[error("CIDR 파싱 실패 {network}: {source}")]
    InvalidNetwork {
        network: String,
        #[source]
        source: ipnet::AddrParseError,
    },
}
