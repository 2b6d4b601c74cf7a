//! lets-proxy는 연결 정보에 따라 요청의 목적지와 헤더를 정하는 리버스 프록시입니다.
//!
//! # 주요 기능
//!
//! - 디렉터 체인 기반 요청 재작성
//! - 로컬 주소별 목적지 맵
//! - 클라이언트 네트워크(CIDR)별 헤더 주입
//! - 클라이언트별 요청 속도 제한
//!
//! # 예제
//!
//! ```
//! use lets_proxy::director::{ConnectionInfo, Destination, Director};
//! use lets_proxy::proxy::{HttpProxy, ProxyConfig};
//!
//! let config = ProxyConfig {
//!     default_target: ":8080".to_string(),
//!     headers: vec!["X-Real-IP:{{SOURCE_IP}}".to_string()],
//!     ..Default::default()
//! };
//!
//! let mut proxy = HttpProxy::new();
//! config.apply(&mut proxy).unwrap();
//!
//! let (mut parts, _) = hyper::Request::builder().body(()).unwrap().into_parts();
//! parts.extensions.insert(ConnectionInfo::new(
//!     "10.0.0.1:80".parse().unwrap(),
//!     "192.168.1.7:50000",
//! ));
//!
//! proxy.director().direct(&mut parts).unwrap();
//!
//! let destination = Destination::from_parts(&parts).unwrap();
//! assert_eq!(destination.host.as_deref(), Some("10.0.0.1:8080"));
//! assert_eq!(parts.headers["x-real-ip"], "192.168.1.7");
//! ```

pub mod addr;
pub mod director;
pub mod logging;
pub mod proxy;
pub mod rate_limit;
pub mod server;
pub mod settings;
