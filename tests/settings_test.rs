use lets_proxy::settings::logging::{LogFormat, LogOutput};
use lets_proxy::settings::{Settings, SettingsError};

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial; // 테스트 격리를 위해 추가

    // 테스트 전후 환경변수 초기화를 위한 헬퍼 함수
    fn cleanup_env() {
        std::env::remove_var("PROXY_CONFIG_FILE");
        std::env::remove_var("PROXY_LISTEN");
        std::env::remove_var("PROXY_LOG_FORMAT");
        std::env::remove_var("PROXY_LOG_LEVEL");
        std::env::remove_var("PROXY_LOG_OUTPUT");
        std::env::remove_var("PROXY_DEFAULT_TARGET");
    }

    // 테스트용 임시 TOML 파일 생성 헬퍼
    fn create_test_toml(content: &str) -> (String, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");
        std::fs::write(&file_path, content).unwrap();
        (file_path.to_str().unwrap().to_string(), dir)
    }

    #[tokio::test]
    #[serial]
    async fn test_default_settings_from_env() {
        cleanup_env();

        let settings = Settings::from_env().await.unwrap();
        assert_eq!(settings.server.listen, vec!["0.0.0.0:80"]);
        assert_eq!(settings.logging.format, LogFormat::Text);
        assert_eq!(settings.logging.level, tracing::Level::INFO);
        assert_eq!(settings.logging.output, LogOutput::Stdout);
        assert_eq!(settings.proxy.default_target, ":80");
    }

    #[tokio::test]
    #[serial]
    async fn test_settings_from_env() {
        cleanup_env();
        std::env::set_var("PROXY_LISTEN", "127.0.0.1:8080, [::1]:8080");
        std::env::set_var("PROXY_LOG_FORMAT", "json");
        std::env::set_var("PROXY_LOG_LEVEL", "debug");
        std::env::set_var("PROXY_LOG_OUTPUT", "/var/log/proxy.log");
        std::env::set_var("PROXY_DEFAULT_TARGET", "127.0.0.1:9000");

        let settings = Settings::from_env().await.unwrap();
        assert_eq!(settings.server.listen, vec!["127.0.0.1:8080", "[::1]:8080"]);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert_eq!(settings.logging.level, tracing::Level::DEBUG);
        assert_eq!(
            settings.logging.output,
            LogOutput::File("/var/log/proxy.log".to_string())
        );
        assert_eq!(settings.proxy.default_target, "127.0.0.1:9000");

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_settings_validation() {
        cleanup_env();

        // 1. 잘못된 로그 레벨
        std::env::set_var("PROXY_LOG_LEVEL", "invalid_level");
        let result = Settings::from_env().await;
        assert!(matches!(result, Err(SettingsError::EnvVarInvalid { .. })));
        cleanup_env();

        // 2. 잘못된 로그 형식
        std::env::set_var("PROXY_LOG_FORMAT", "xml");
        assert!(Settings::from_env().await.is_err());
        cleanup_env();

        // 3. 포트 없는 수신 주소
        std::env::set_var("PROXY_LISTEN", "127.0.0.1");
        assert!(Settings::from_env().await.is_err());
        cleanup_env();

        // 4. 빈 수신 주소 목록
        std::env::set_var("PROXY_LISTEN", " , ");
        assert!(matches!(
            Settings::from_env().await,
            Err(SettingsError::EnvVarMissing { .. })
        ));
        cleanup_env();

        // 5. 빈 기본 대상
        std::env::set_var("PROXY_DEFAULT_TARGET", "  ");
        assert!(matches!(
            Settings::from_env().await,
            Err(SettingsError::InvalidConfig { ref key, .. }) if key == "proxy.DefaultTarget"
        ));
        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_load_prefers_config_file() {
        cleanup_env();
        let (path, _dir) = create_test_toml(
            r#"
            [server]
            listen = [":18080"]

            [logging]
            level = "warn"
            output = "stdout"

            [proxy]
            DefaultTarget = "10.0.0.1:80"
            TargetMap = ["1.2.3.1:443-3.3.3.3:80"]
            "#,
        );
        std::env::set_var("PROXY_CONFIG_FILE", &path);
        std::env::set_var("PROXY_DEFAULT_TARGET", "ignored:1");

        let settings = Settings::load().await.unwrap();
        assert_eq!(settings.server.listen, vec![":18080"]);
        assert_eq!(settings.logging.level, tracing::Level::WARN);
        assert_eq!(settings.proxy.default_target, "10.0.0.1:80");
        assert_eq!(settings.proxy.target_map, vec!["1.2.3.1:443-3.3.3.3:80"]);

        cleanup_env();
    }

    #[tokio::test]
    #[serial]
    async fn test_invalid_toml() {
        cleanup_env();
        let (path, _dir) = create_test_toml(
            r#"
            [proxy]
            RateLimit = "many"
            "#,
        );

        let result = Settings::from_toml_file(&path).await;
        assert!(matches!(result, Err(SettingsError::ParseError { .. })));
    }
}
