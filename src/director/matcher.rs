use std::cmp::Ordering;
use std::net::IpAddr;

use ipnet::IpNet;

/// 네트워크 접두사 매처
///
/// 항목은 생성 시 한 번 정렬됩니다: 주소 체계 폭(IPv4 먼저), 접두사 길이,
/// 네트워크 주소 바이트 순. 한 주소에 여러 항목이 일치하면 덜 구체적인
/// 항목부터 돌려주므로 뒤에 적용되는 더 구체적인 항목이 이깁니다.
#[derive(Debug, Clone)]
pub struct NetworkMatcher<T> {
    entries: Vec<(IpNet, T)>,
}

impl<T> NetworkMatcher<T> {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (IpNet, T)>,
    {
        let mut entries: Vec<(IpNet, T)> = entries
            .into_iter()
            .map(|(net, value)| (net.trunc(), value))
            .collect();
        entries.sort_by(|(a, _), (b, _)| specificity_cmp(a, b));
        Self { entries }
    }

    /// `ip`를 포함하는 항목을 정렬 순서대로 돌려줍니다.
    pub fn matching(&self, ip: IpAddr) -> impl Iterator<Item = (&IpNet, &T)> + '_ {
        let ip = ip.to_canonical();
        self.entries
            .iter()
            .filter(move |(net, _)| net.contains(&ip))
            .map(|(net, value)| (net, value))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IpNet, &T)> + '_ {
        self.entries.iter().map(|(net, value)| (net, value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn address_width(net: &IpNet) -> usize {
    match net {
        IpNet::V4(_) => 4,
        IpNet::V6(_) => 16,
    }
}

fn specificity_cmp(a: &IpNet, b: &IpNet) -> Ordering {
    address_width(a)
        .cmp(&address_width(b))
        .then_with(|| a.prefix_len().cmp(&b.prefix_len()))
        .then_with(|| match (a, b) {
            (IpNet::V4(a), IpNet::V4(b)) => a.network().octets().cmp(&b.network().octets()),
            (IpNet::V6(a), IpNet::V6(b)) => a.network().octets().cmp(&b.network().octets()),
            _ => Ordering::Equal,
        })
}
