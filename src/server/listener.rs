use std::net::SocketAddr;
use std::sync::Arc;

use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tracing::{error, info};
use uuid::Uuid;

use super::error::Error;
use super::handler::RequestHandler;
use super::Result;
use crate::addr::split_host_port;
use crate::director::ConnectionInfo;
use crate::settings::ServerSettings;

/// 평문 HTTP 리스너 묶음
pub struct ServerListener {
    listeners: Vec<TcpListener>,
}

impl ServerListener {
    /// 설정된 모든 주소에 바인딩합니다. 호스트가 비어 있으면 `0.0.0.0`입니다.
    pub async fn bind(settings: &ServerSettings) -> Result<Self> {
        let mut listeners = Vec::with_capacity(settings.listen.len());

        for addr in &settings.listen {
            let (host, port) = split_host_port(addr).map_err(|source| Error::ListenAddr {
                addr: addr.clone(),
                source,
            })?;
            let bind_addr = match host {
                "" => format!("0.0.0.0:{}", port),
                _ if host.contains(':') => format!("[{}]:{}", host, port),
                _ => format!("{}:{}", host, port),
            };

            let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
                error!(error = %e, addr = %bind_addr, "HTTP 포트 바인딩 실패");
                Error::Bind {
                    addr: bind_addr.clone(),
                    source: e,
                }
            })?;

            info!(addr = %listener.local_addr()?, "HTTP 리스너 시작");
            listeners.push(listener);
        }

        Ok(Self { listeners })
    }

    /// 실제 바인딩된 주소 (포트 0으로 바인딩한 경우 확인용)
    pub fn local_addrs(&self) -> Result<Vec<SocketAddr>> {
        self.listeners
            .iter()
            .map(|l| l.local_addr().map_err(Error::from))
            .collect()
    }

    /// 연결을 받아 각각 별도 태스크에서 처리합니다. 리스너 태스크가 끝나면 반환합니다.
    pub async fn run(self, handler: Arc<RequestHandler>) -> Result<()> {
        let mut tasks = JoinSet::new();
        for listener in self.listeners {
            tasks.spawn(accept_loop(listener, handler.clone()));
        }

        while let Some(result) = tasks.join_next().await {
            result?;
        }
        Ok(())
    }
}

async fn accept_loop(listener: TcpListener, handler: Arc<RequestHandler>) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!(error = %e, "HTTP 연결 수락 실패");
                continue;
            }
        };

        let local_addr = match stream.local_addr() {
            Ok(addr) => addr,
            Err(e) => {
                error!(error = %e, "로컬 주소 확인 실패");
                continue;
            }
        };

        let info = ConnectionInfo::new(local_addr, remote_addr.to_string())
            .with_connection_id(Uuid::new_v4().to_string())
            .with_tls(false);

        let handler = handler.clone();
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(err) = handler.handle_connection(io, info).await {
                error!(error = %err, "HTTP 연결 처리 실패");
            }
        });
    }
}
