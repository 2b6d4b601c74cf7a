use lets_proxy::{
    logging::init_logging,
    server::Server,
    settings::Settings,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let settings = match Settings::load().await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&settings.logging);
    info!(listen = ?settings.server.listen, "설정 로드 완료");

    let server = match Server::new(&settings).await {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "서버 초기화 실패");
            std::process::exit(1);
        }
    };

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!(error = %e, "서버 실행 실패");
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("종료 신호 수신");
        }
    }
}
