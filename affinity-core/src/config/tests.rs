#[cfg(test)]
mod tests {
    use crate::config::loader::load_config_from_path;
    use crate::config::model::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn create_test_service() -> ServiceConfig {
        ServiceConfig {
            name: "collection".to_string(),
            strategy: LoadBalanceStrategy::Consistent,
            load_factor: Some(1.25),
            srv_name: Some("_http._tcp.collection.default.svc.cluster.local".to_string()),
            instances: vec!["10.0.0.1:4040".to_string(), "10.0.0.2:4040".to_string()],
            enabled: true,
        }
    }

    fn create_test_config() -> Config {
        let mut services = HashMap::new();
        services.insert("collection".to_string(), create_test_service());

        Config {
            services,
            settings: GlobalSettings::default(),
        }
    }

    #[test]
    fn test_config_validation_success() {
        let config = create_test_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_empty_service_name() {
        let mut config = create_test_config();
        config.services.get_mut("collection").unwrap().name = "".to_string();

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty name"));
    }

    #[test]
    fn test_config_validation_load_factor_below_one() {
        let mut config = create_test_config();
        config.services.get_mut("collection").unwrap().load_factor = Some(0.9);

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("invalid load_factor"));
    }

    #[test]
    fn test_config_validation_load_factor_not_finite() {
        let mut config = create_test_config();
        config.services.get_mut("collection").unwrap().load_factor = Some(f64::NAN);
        assert!(config.validate().is_err());

        let mut config = create_test_config();
        config.settings.default_load_factor = f64::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_load_factor_exactly_one() {
        let mut config = create_test_config();
        config.services.get_mut("collection").unwrap().load_factor = Some(1.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_duplicate_instance() {
        let mut config = create_test_config();
        config
            .services
            .get_mut("collection")
            .unwrap()
            .instances
            .push("10.0.0.1:4040".to_string());

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("more than once"));
    }

    #[test]
    fn test_config_validation_instance_with_whitespace() {
        let mut config = create_test_config();
        config.services.get_mut("collection").unwrap().instances = vec!["10.0.0.1 :4040".to_string()];

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("whitespace"));
    }

    #[test]
    fn test_config_validation_zero_queue_capacity() {
        let mut config = create_test_config();
        config.settings.event_queue_capacity = 0;

        let result = config.validate();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("event_queue_capacity"));
    }

    #[test]
    fn test_effective_load_factor_falls_back_to_settings() {
        let mut service = create_test_service();
        let settings = GlobalSettings {
            default_load_factor: 1.5,
            ..GlobalSettings::default()
        };

        assert_eq!(service.effective_load_factor(&settings), 1.25);
        service.load_factor = None;
        assert_eq!(service.effective_load_factor(&settings), 1.5);
    }

    #[test]
    fn test_enabled_services_sorted() {
        let mut config = create_test_config();
        let mut disabled = create_test_service();
        disabled.name = "notebooks".to_string();
        disabled.enabled = false;
        config.services.insert("notebooks".to_string(), disabled);

        let mut users = create_test_service();
        users.name = "users".to_string();
        config.services.insert("users".to_string(), users);

        assert_eq!(config.get_enabled_services(), vec!["collection", "users"]);
    }

    #[test]
    fn test_parse_toml_with_defaults() {
        let toml_str = r#"
[services.query]
name = "query"
strategy = "round_robin"
instances = ["10.0.1.1:80"]
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let service = config.get_service("query").unwrap();

        assert_eq!(service.strategy, LoadBalanceStrategy::RoundRobin);
        assert!(service.enabled);
        assert!(service.load_factor.is_none());
        assert_eq!(config.settings.default_load_factor, 1.25);
        assert_eq!(config.settings.event_queue_capacity, 16);
        assert_eq!(config.settings.discovery_poll_interval_seconds, 5);
    }

    #[test]
    fn test_load_config_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[settings]
default_load_factor = 1.1

[services.collection]
name = "collection"
load_factor = 1.3
instances = ["10.0.0.1:4040", "10.0.0.2:4040", "10.0.0.3:4040"]
"#
        )
        .unwrap();

        let config = load_config_from_path(file.path().to_str().unwrap()).unwrap();
        let service = config.get_service("collection").unwrap();
        assert_eq!(service.instances.len(), 3);
        assert_eq!(service.effective_load_factor(&config.settings), 1.3);
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[services.collection]
name = "collection"
load_factor = 0.5
"#
        )
        .unwrap();

        assert!(load_config_from_path(file.path().to_str().unwrap()).is_err());
    }
}
