use lets_proxy::director::*;
use hyper::http::request::Parts;
use hyper::http::uri::Scheme;
use hyper::Request;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// 테스트 헬퍼 함수
fn empty_parts() -> Parts {
    let (parts, _) = Request::builder().uri("/").body(()).unwrap().into_parts();
    parts
}

fn parts_with(local: &str, remote: &str) -> Parts {
    let mut parts = empty_parts();
    parts
        .extensions
        .insert(ConnectionInfo::new(local.parse().unwrap(), remote));
    parts
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).map(|v| v.to_str().unwrap())
}

fn destination_host(parts: &Parts) -> Option<&str> {
    Destination::from_parts(parts).and_then(|d| d.host.as_deref())
}

/// 실행 순서와 직전 상태를 기록하는 디렉터
struct RecordingDirector {
    name: &'static str,
    counter: Arc<AtomicUsize>,
}

impl Director for RecordingDirector {
    fn direct(&self, parts: &mut Parts) -> Result<(), DirectorError> {
        let seen = parts
            .headers
            .get("x-trace")
            .map(|v| v.to_str().unwrap().to_string())
            .unwrap_or_default();
        let next = if seen.is_empty() {
            self.name.to_string()
        } else {
            format!("{},{}", seen, self.name)
        };
        parts.headers.insert("x-trace", next.parse().unwrap());
        self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FailingDirector;

impl Director for FailingDirector {
    fn direct(&self, _parts: &mut Parts) -> Result<(), DirectorError> {
        Err(DirectorError::MissingConnectionInfo)
    }
}

fn recording(name: &'static str, counter: &Arc<AtomicUsize>) -> Option<Box<dyn Director>> {
    Some(Box::new(RecordingDirector {
        name,
        counter: counter.clone(),
    }))
}

#[test]
fn test_chain_sequential_visibility() {
    let counter = Arc::new(AtomicUsize::new(0));
    let chain = DirectorChain::new([
        recording("d1", &counter),
        recording("d2", &counter),
        recording("d3", &counter),
    ]);

    let mut parts = empty_parts();
    chain.direct(&mut parts).unwrap();

    // 각 디렉터는 앞선 디렉터의 변경만 봄
    assert_eq!(header(&parts, "x-trace"), Some("d1,d2,d3"));
    assert_eq!(counter.load(Ordering::SeqCst), 3);
}

#[test]
fn test_chain_skips_missing_directors() {
    let counter = Arc::new(AtomicUsize::new(0));
    let with_gaps = DirectorChain::new([
        None,
        recording("d1", &counter),
        None,
        recording("d2", &counter),
        None,
    ]);
    let compact = DirectorChain::new([recording("d1", &counter), recording("d2", &counter)]);
    assert_eq!(with_gaps.len(), 2);

    let mut a = empty_parts();
    let mut b = empty_parts();
    with_gaps.direct(&mut a).unwrap();
    compact.direct(&mut b).unwrap();
    assert_eq!(a.headers, b.headers);
}

#[test]
fn test_chain_stops_at_first_error() {
    let counter = Arc::new(AtomicUsize::new(0));
    let chain = DirectorChain::new([
        recording("d1", &counter),
        Some(Box::new(FailingDirector) as Box<dyn Director>),
        recording("d2", &counter),
    ]);

    let mut parts = empty_parts();
    assert!(matches!(
        chain.direct(&mut parts),
        Err(DirectorError::MissingConnectionInfo)
    ));
    // 앞선 변경은 유지되고 뒤의 디렉터는 실행되지 않음
    assert_eq!(header(&parts, "x-trace"), Some("d1"));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_empty_chain_is_noop() {
    let chain = DirectorChain::default();
    assert!(chain.is_empty());

    let mut parts = empty_parts();
    chain.direct(&mut parts).unwrap();
    assert!(parts.headers.is_empty());
    assert_eq!(destination_host(&parts), None);
}

#[test]
fn test_destination_map() {
    let map = HashMap::from([
        ("1.2.3.1:443".to_string(), "3.3.3.3:80".to_string()),
        ("1.2.3.2:443".to_string(), "2.2.2.2:80".to_string()),
    ]);
    let director = DestinationMap::new(map);

    let mut parts = parts_with("1.2.3.1:443", "5.5.5.5:1000");
    director.direct(&mut parts).unwrap();
    assert_eq!(destination_host(&parts), Some("3.3.3.3:80"));

    let mut parts = parts_with("8.8.8.8:443", "5.5.5.5:1000");
    director.direct(&mut parts).unwrap();
    assert_eq!(destination_host(&parts), None);

    // IPv4-mapped 로컬 주소도 같은 키로 조회
    let mut parts = parts_with("[::ffff:1.2.3.2]:443", "5.5.5.5:1000");
    director.direct(&mut parts).unwrap();
    assert_eq!(destination_host(&parts), Some("2.2.2.2:80"));

    let mut parts = empty_parts();
    assert!(matches!(
        director.direct(&mut parts),
        Err(DirectorError::MissingConnectionInfo)
    ));
}

#[test]
fn test_destination_map_keeps_previous_host_on_miss() {
    let chain = DirectorChain::new([
        Some(Box::new(StaticHost::new("9.9.9.9:80")) as Box<dyn Director>),
        Some(Box::new(DestinationMap::new(HashMap::from([(
            "1.2.3.1:443".to_string(),
            "3.3.3.3:80".to_string(),
        )])))),
    ]);

    let mut parts = parts_with("8.8.8.8:443", "5.5.5.5:1000");
    chain.direct(&mut parts).unwrap();
    assert_eq!(destination_host(&parts), Some("9.9.9.9:80"));
}

#[test]
fn test_set_headers_tokens() {
    let director = SetHeaders::new([
        ("X-Connection-Id", CONNECTION_ID),
        ("X-Proto", HTTP_PROTO),
        ("X-Source-Ip", SOURCE_IP),
        ("X-Source-Port", SOURCE_PORT),
        ("X-Source", SOURCE_IP_PORT),
        ("X-Literal", "static-value"),
    ])
    .unwrap();

    let info = ConnectionInfo::new("10.0.0.1:443".parse().unwrap(), "1.2.3.4:881")
        .with_connection_id("123");

    let test_cases = vec![
        (None, PROTOCOL_DETECTION_ERROR),
        (Some(true), "https"),
        (Some(false), "http"),
    ];

    for (tls, expected_proto) in test_cases {
        let mut parts = empty_parts();
        let mut info = info.clone();
        info.tls = tls;
        parts.extensions.insert(info);

        director.direct(&mut parts).unwrap();
        assert_eq!(header(&parts, "x-proto"), Some(expected_proto), "tls: {:?}", tls);
        assert_eq!(header(&parts, "x-connection-id"), Some("123"));
        assert_eq!(header(&parts, "x-source-ip"), Some("1.2.3.4"));
        assert_eq!(header(&parts, "x-source-port"), Some("881"));
        assert_eq!(header(&parts, "x-source"), Some("1.2.3.4:881"));
        assert_eq!(header(&parts, "x-literal"), Some("static-value"));
    }
}

#[test]
fn test_set_headers_overwrites_existing() {
    let director = SetHeaders::new([("X-Forwarded-Proto", HTTP_PROTO)]).unwrap();

    let mut parts = parts_with("10.0.0.1:443", "1.2.3.4:881");
    parts
        .headers
        .insert("x-forwarded-proto", "spoofed".parse().unwrap());
    parts
        .headers
        .append("x-forwarded-proto", "spoofed-2".parse().unwrap());

    director.direct(&mut parts).unwrap();
    let values: Vec<_> = parts.headers.get_all("x-forwarded-proto").iter().collect();
    assert_eq!(values, vec![PROTOCOL_DETECTION_ERROR]);
}

#[test]
fn test_set_headers_without_connection_info() {
    let director = SetHeaders::new([("X-Proto", HTTP_PROTO), ("X-Source-Ip", SOURCE_IP)]).unwrap();

    let mut parts = empty_parts();
    director.direct(&mut parts).unwrap();
    assert_eq!(header(&parts, "x-proto"), Some(PROTOCOL_DETECTION_ERROR));
    assert_eq!(header(&parts, "x-source-ip"), Some(""));
}

#[test]
fn test_set_headers_ipv6_source() {
    let director = SetHeaders::new([("X-Source", SOURCE_IP_PORT)]).unwrap();

    let mut parts = parts_with("[::1]:443", "[fe80::1]:897");
    director.direct(&mut parts).unwrap();
    assert_eq!(header(&parts, "x-source"), Some("fe80::1:897"));
}

fn headers(pairs: &[(&str, &str)]) -> Vec<HttpHeader> {
    pairs
        .iter()
        .map(|(name, value)| HttpHeader::new(name, value).unwrap())
        .collect()
}

#[test]
fn test_headers_by_network_family() {
    let director = SetHeadersByNetwork::new([
        ("192.168.0.0/24", headers(&[("X-Net", "v4"), ("X-V4", "yes")])),
        ("fe80::/64", headers(&[("X-Net", "v6"), ("X-V6", "yes")])),
    ])
    .unwrap();

    let mut parts = parts_with("10.0.0.1:80", "192.168.0.19:897");
    assert_eq!(director.apply(&mut parts).unwrap(), NetworkMatch::Applied(1));
    assert_eq!(header(&parts, "x-net"), Some("v4"));
    assert_eq!(header(&parts, "x-v4"), Some("yes"));
    assert_eq!(header(&parts, "x-v6"), None);

    let mut parts = parts_with("10.0.0.1:80", "[fe80::28ca:829b:2d2e:a908]:897");
    assert_eq!(director.apply(&mut parts).unwrap(), NetworkMatch::Applied(1));
    assert_eq!(header(&parts, "x-net"), Some("v6"));
    assert_eq!(header(&parts, "x-v6"), Some("yes"));
    assert_eq!(header(&parts, "x-v4"), None);

    let mut parts = parts_with("10.0.0.1:80", "8.8.8.8:897");
    assert_eq!(director.apply(&mut parts).unwrap(), NetworkMatch::Applied(0));
    assert!(parts.headers.is_empty());
}

#[test]
fn test_headers_by_network_specificity() {
    // 입력 순서와 무관하게 더 구체적인 네트워크가 나중에 적용됨
    let director = SetHeadersByNetwork::new([
        ("192.168.0.0/30", headers(&[("X-Level", "30"), ("X-Only-30", "1")])),
        ("0.0.0.0/0", headers(&[("X-Level", "0"), ("X-Any", "1")])),
        ("192.168.0.0/16", headers(&[("X-Level", "16")])),
    ])
    .unwrap();

    let mut parts = parts_with("10.0.0.1:80", "192.168.0.2:897");
    assert_eq!(director.apply(&mut parts).unwrap(), NetworkMatch::Applied(3));
    assert_eq!(header(&parts, "x-level"), Some("30"));
    assert_eq!(header(&parts, "x-any"), Some("1"));
    assert_eq!(header(&parts, "x-only-30"), Some("1"));

    let mut parts = parts_with("10.0.0.1:80", "192.168.5.5:897");
    assert_eq!(director.apply(&mut parts).unwrap(), NetworkMatch::Applied(2));
    assert_eq!(header(&parts, "x-level"), Some("16"));
    assert_eq!(header(&parts, "x-only-30"), None);
}

#[test]
fn test_headers_by_network_mapped_remote() {
    let director =
        SetHeadersByNetwork::new([("192.168.0.0/24", headers(&[("X-Net", "v4")]))]).unwrap();

    let mut parts = parts_with("10.0.0.1:80", "[::ffff:192.168.0.19]:897");
    assert_eq!(director.apply(&mut parts).unwrap(), NetworkMatch::Applied(1));
    assert_eq!(header(&parts, "x-net"), Some("v4"));
}

#[test]
fn test_headers_by_network_ignores_remote_port() {
    let director =
        SetHeadersByNetwork::new([("1.2.3.0/24", headers(&[("X-Net", "lan")]))]).unwrap();
    let source = SetHeaders::new([("X-Src", SOURCE_IP)]).unwrap();

    // 포트가 비었거나 숫자가 아니어도 호스트 IP로 판단
    for remote in ["1.2.3.4:", "1.2.3.4:http", "1.2.3.4:70000"] {
        let mut parts = parts_with("10.0.0.1:80", remote);
        source.direct(&mut parts).unwrap();
        assert_eq!(
            director.apply(&mut parts).unwrap(),
            NetworkMatch::Applied(1),
            "remote: {:?}",
            remote
        );
        assert_eq!(header(&parts, "x-net"), Some("lan"));
        assert_eq!(header(&parts, "x-src"), Some("1.2.3.4"));
    }
}

#[test]
fn test_headers_by_network_malformed_remote() {
    let director =
        SetHeadersByNetwork::new([("0.0.0.0/0", headers(&[("X-Any", "1")]))]).unwrap();

    for remote in ["172.168.0:897", "172.168.0.1", "", "garbage"] {
        let mut parts = parts_with("10.0.0.1:80", remote);
        assert_eq!(
            director.apply(&mut parts).unwrap(),
            NetworkMatch::UnparsableRemoteAddr,
            "remote: {:?}",
            remote
        );
        assert!(parts.headers.is_empty());

        // 디렉터로 실행해도 체인을 중단하지 않음
        director.direct(&mut parts).unwrap();
        assert!(parts.headers.is_empty());
    }

    let mut parts = empty_parts();
    assert!(matches!(
        director.direct(&mut parts),
        Err(DirectorError::MissingConnectionInfo)
    ));
}

#[test]
fn test_headers_by_network_round_trip() {
    let rules = vec![
        ("10.0.0.0/8", "10.1.2.3", headers(&[("X-A", "a")])),
        ("172.16.0.0/12", "172.20.0.1", headers(&[("X-B", "b"), ("X-C", "c")])),
        ("2001:db8::/32", "2001:db8::1", headers(&[("X-D", "d")])),
        ("fd00::/8", "fd12::1", headers(&[("X-E", "e")])),
    ];

    let director = SetHeadersByNetwork::new(
        rules
            .iter()
            .map(|(net, _, headers)| (*net, headers.clone())),
    )
    .unwrap();

    for (network, sample, expected) in &rules {
        let ip: IpAddr = sample.parse().unwrap();
        let mut found = Vec::new();
        director
            .iter_by_incoming_networks(ip, |net, headers| {
                found.push((net.to_string(), headers.to_vec()));
                Ok::<(), ()>(())
            })
            .unwrap();
        assert_eq!(found, vec![(network.to_string(), expected.clone())]);
    }
}

#[test]
fn test_iter_by_incoming_networks_propagates_error() {
    let director = SetHeadersByNetwork::new([
        ("10.0.0.0/8", headers(&[("X-A", "a")])),
        ("10.1.0.0/16", headers(&[("X-B", "b")])),
    ])
    .unwrap();

    let mut calls = 0;
    let result = director.iter_by_incoming_networks("10.1.2.3".parse().unwrap(), |_, _| {
        calls += 1;
        Err("stop")
    });
    assert_eq!(result, Err("stop"));
    assert_eq!(calls, 1);
}

#[test]
fn test_headers_by_network_invalid_cidr() {
    let result = SetHeadersByNetwork::new([("not-a-network", headers(&[("X-A", "a")]))]);
    assert!(matches!(result, Err(DirectorError::InvalidNetwork { .. })));

    let result = SetHeadersByNetwork::new([("", headers(&[("X-A", "a")]))]);
    assert!(matches!(result, Err(DirectorError::InvalidNetwork { .. })));
}

#[test]
fn test_same_ip_and_scheme_chain() {
    let chain = DirectorChain::new([
        Some(Box::new(SameIp::new(8080)) as Box<dyn Director>),
        Some(Box::new(SetScheme::https())),
    ]);

    let mut parts = parts_with("[::ffff:10.0.0.5]:443", "1.2.3.4:5555");
    chain.direct(&mut parts).unwrap();

    let destination = Destination::from_parts(&parts).unwrap();
    assert_eq!(destination.host.as_deref(), Some("10.0.0.5:8080"));
    assert_eq!(destination.scheme, Some(Scheme::HTTPS));
}
