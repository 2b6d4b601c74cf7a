pub mod error;
pub mod handler;
pub mod listener;

pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use handler::RequestHandler;
pub use listener::ServerListener;

use std::sync::Arc;

use tracing::info;

use crate::proxy::HttpProxy;
use crate::settings::Settings;

/// 설정을 적용한 프록시와 바인딩된 리스너
pub struct Server {
    listener: ServerListener,
    handler: Arc<RequestHandler>,
}

impl Server {
    pub async fn new(settings: &Settings) -> Result<Self> {
        let mut proxy = HttpProxy::new();
        settings.proxy.apply(&mut proxy)?;

        let handler = Arc::new(RequestHandler::new(Arc::new(proxy))?);
        let listener = ServerListener::bind(&settings.server).await?;

        Ok(Self { listener, handler })
    }

    pub fn local_addrs(&self) -> Result<Vec<std::net::SocketAddr>> {
        self.listener.local_addrs()
    }

    /// 실행 중 디렉터 체인을 교체할 때 사용
    pub fn proxy(&self) -> Arc<HttpProxy> {
        self.handler.proxy().clone()
    }

    pub async fn run(self) -> Result<()> {
        info!(directors = self.handler.proxy().director().len(), "프록시 서버 시작");
        self.listener.run(self.handler).await
    }
}
