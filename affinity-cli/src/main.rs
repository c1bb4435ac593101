//! Affinity CLI Tool
//!
//! Command line interface for validating balancer configuration and
//! inspecting how affinity keys are routed

use affinity_core::config::loader::{get_config_path, load_config_from_path};
use affinity_core::{Config, EndpointRef, LoadBalanceStrategy, ServiceConfig};
use affinity_loadbalance::{build_static_balancer, Balancer};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::Rng;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "affinity-cli")]
#[command(about = "A CLI tool for inspecting the affinity balancer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate configuration file
    ValidateConfig {
        /// Path to configuration file, defaults to $CONFIG_PATH or config.toml
        #[arg(short, long)]
        config: Option<String>,
    },
    /// Generate example configuration file
    GenerateConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config_example.toml")]
        output: String,
    },
    /// Route affinity keys against a service's static instances
    Route {
        /// Path to configuration file, defaults to $CONFIG_PATH or config.toml
        #[arg(short, long)]
        config: Option<String>,
        /// Service ID to route against
        #[arg(short, long)]
        service: String,
        /// Affinity keys, routed in order while holding their load
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Simulate random traffic and show the resulting load distribution
    Simulate {
        /// Path to configuration file, defaults to $CONFIG_PATH or config.toml
        #[arg(short, long)]
        config: Option<String>,
        /// Service ID to simulate
        #[arg(short, long)]
        service: String,
        /// Number of requests to issue
        #[arg(short, long, default_value_t = 1000)]
        requests: usize,
        /// Number of distinct affinity keys
        #[arg(short, long, default_value_t = 100)]
        keys: usize,
        /// Probability of finishing an in-flight request at each step
        #[arg(long, default_value_t = 0.5)]
        release_probability: f64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 日志级别由RUST_LOG环境变量控制
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::ValidateConfig { config } => {
            let config = config.unwrap_or_else(get_config_path);
            println!("Validating configuration file: {}", config);
            match load_config_from_path(&config) {
                Ok(cfg) => {
                    println!("✅ Configuration is valid");
                    print_config_summary(&cfg);
                }
                Err(e) => {
                    eprintln!("❌ Configuration validation failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::GenerateConfig { output } => {
            println!("Generating configuration file: {}", output);
            std::fs::write(&output, EXAMPLE_CONFIG)
                .with_context(|| format!("failed to write {}", output))?;
            println!("✅ Configuration file generated successfully");
        }
        Commands::Route {
            config,
            service,
            keys,
        } => {
            let cfg = load_config_from_path(&config.unwrap_or_else(get_config_path))?;
            let service = find_service(&cfg, &service)?;
            route_keys(&cfg, service, &keys).await?;
        }
        Commands::Simulate {
            config,
            service,
            requests,
            keys,
            release_probability,
        } => {
            if !(0.0..=1.0).contains(&release_probability) {
                anyhow::bail!("release_probability must be between 0.0 and 1.0");
            }
            if keys == 0 {
                anyhow::bail!("keys must be greater than 0");
            }
            let cfg = load_config_from_path(&config.unwrap_or_else(get_config_path))?;
            let service = find_service(&cfg, &service)?;
            simulate(&cfg, service, requests, keys, release_probability).await?;
        }
    }

    Ok(())
}

fn print_config_summary(cfg: &Config) {
    println!("  - {} services configured", cfg.services.len());
    println!(
        "  - default load factor {}, event queue capacity {}",
        cfg.settings.default_load_factor, cfg.settings.event_queue_capacity
    );

    for service_id in cfg.get_enabled_services() {
        let Some(service) = cfg.get_service(&service_id) else {
            continue;
        };
        match service.strategy {
            LoadBalanceStrategy::Consistent => println!(
                "  - {}: consistent (load factor {}), {} static instances",
                service_id,
                service.effective_load_factor(&cfg.settings),
                service.instances.len()
            ),
            LoadBalanceStrategy::RoundRobin => println!(
                "  - {}: round robin, {} static instances",
                service_id,
                service.instances.len()
            ),
        }
    }
}

fn find_service<'a>(cfg: &'a Config, service_id: &str) -> Result<&'a ServiceConfig> {
    let service = cfg
        .get_service(service_id)
        .ok_or_else(|| anyhow::anyhow!("Service '{}' not found", service_id))?;
    if !service.enabled {
        anyhow::bail!("Service '{}' is disabled", service_id);
    }
    Ok(service)
}

async fn open_balancer(cfg: &Config, service: &ServiceConfig) -> Result<Arc<dyn Balancer>> {
    let balancer = build_static_balancer(service, &cfg.settings)?;
    balancer.synced().await;
    Ok(balancer)
}

/// 依次路由每个键，期间不释放负载，便于观察溢出
async fn route_keys(cfg: &Config, service: &ServiceConfig, keys: &[String]) -> Result<()> {
    let balancer = open_balancer(cfg, service).await?;
    let mut held = Vec::with_capacity(keys.len());

    for key in keys {
        let endpoint = balancer.get(key)?;
        println!("{} -> {}", key, endpoint.host_and_port());
        held.push(endpoint);
    }

    if let Some(stats) = balancer.load_stats() {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    for endpoint in &held {
        balancer.put(endpoint);
    }
    balancer.close().await;
    Ok(())
}

async fn simulate(
    cfg: &Config,
    service: &ServiceConfig,
    requests: usize,
    keys: usize,
    release_probability: f64,
) -> Result<()> {
    let balancer = open_balancer(cfg, service).await?;
    let mut rng = rand::rng();
    let mut in_flight: Vec<EndpointRef> = Vec::new();

    info!(
        "Simulating {} requests over {} keys against '{}'",
        requests, keys, service.name
    );

    for _ in 0..requests {
        let key = format!("key-{}", rng.random_range(0..keys));
        in_flight.push(balancer.get(&key)?);

        if rng.random_bool(release_probability) {
            let index = rng.random_range(0..in_flight.len());
            let endpoint = in_flight.swap_remove(index);
            balancer.put(&endpoint);
        }
    }

    println!("{} requests still in flight", in_flight.len());
    if let Some(stats) = balancer.load_stats() {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        println!("peak/average load: {:.2}", stats.peak_to_average());
    }

    for endpoint in &in_flight {
        balancer.put(endpoint);
    }
    balancer.close().await;
    Ok(())
}

const EXAMPLE_CONFIG: &str = r#"# Affinity balancer configuration

[settings]
# 未单独配置时使用的负载因子（>= 1.0）
default_load_factor = 1.25
# 服务发现事件队列容量
event_queue_capacity = 16
# 外部DNS轮询间隔
discovery_poll_interval_seconds = 5

# 会话亲和：同一个会话尽量落到同一实例，但任何实例的负载都不超过平均值的1.25倍
[services.collection]
name = "collection"
strategy = "consistent"
load_factor = 1.25
srv_name = "_http._tcp.collection.default.svc.cluster.local"
instances = ["10.0.0.1:4040", "10.0.0.2:4040", "10.0.0.3:4040"]

[services.query]
name = "query"
strategy = "round_robin"
srv_name = "_http._tcp.query.default.svc.cluster.local"
instances = ["10.0.1.1:80", "10.0.1.2:80"]
"#;
