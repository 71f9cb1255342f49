use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "wastebot")]
#[command(about = "Waste-sorting LINE bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Run the webhook server (GET /, GET /test, POST /callback).
    Serve {
        /// Config file path (default: WASTEBOT_CONFIG_PATH or ~/.wastebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,

        /// Listen port (default from PORT env, config, or 5000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Print the resolved configuration (API key presence, model, categories) and exit.
    Check {
        /// Config file path (default: WASTEBOT_CONFIG_PATH or ~/.wastebot/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<std::path::PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("failed to load .env: {}", e);
        }
    }

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("wastebot {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Serve { config, port }) => {
            if let Err(e) = run_serve(config, port).await {
                eprintln!("serve failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Check { config }) => {
            init_logging(false);
            if let Err(e) = run_check(config) {
                log::error!("check failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    if let Err(e) =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
            .try_init()
    {
        eprintln!("logger already initialised: {}", e);
    }
}

fn load(config_path: Option<std::path::PathBuf>) -> anyhow::Result<lib::config::Config> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    lib::config::apply_env_overrides(&mut config);
    Ok(config)
}

/// Logger goes up before env overrides are folded in, so their warnings are not lost.
fn load_for_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<lib::config::Config> {
    let (mut config, _path) = lib::config::load_config(config_path)?;
    init_logging(lib::config::resolve_debug(&config));
    lib::config::apply_env_overrides(&mut config);
    if let Some(p) = port {
        config.gateway.port = p;
    }
    Ok(config)
}

async fn run_serve(
    config_path: Option<std::path::PathBuf>,
    port: Option<u16>,
) -> anyhow::Result<()> {
    let config = load_for_serve(config_path, port)?;
    print_banner(&config);
    lib::gateway::run_gateway(config).await
}

fn print_banner(config: &lib::config::Config) {
    let key_status = if lib::config::resolve_openai_api_key(config).is_some() {
        "✅ 已設定"
    } else {
        "❌ 未設定"
    };
    println!("🚀 啟動垃圾分類機器人...");
    println!("📁 模組載入狀態：");
    println!("  • 圖片處理器: ✅ 就緒");
    println!("  • AI 分析器: ✅ 就緒 ({})", lib::config::resolve_openai_model(config));
    println!("  • OpenAI 金鑰: {}", key_status);
    println!("🌐 服務網址: http://127.0.0.1:{}", config.gateway.port);
    println!("⏹️  按 Ctrl+C 停止服務");
}

fn run_check(config_path: Option<std::path::PathBuf>) -> anyhow::Result<()> {
    let config = load(config_path)?;
    println!("=== CONFIG CHECK ===");
    match lib::config::resolve_openai_api_key(&config) {
        Some(key) => {
            println!("✅ OpenAI key found");
            println!("Key: {}", lib::config::mask_secret(&key, 15));
        }
        None => println!("❌ No OpenAI key"),
    }
    let secret = lib::config::resolve_channel_secret(&config);
    if secret == lib::config::PLACEHOLDER_CHANNEL_SECRET {
        println!("⚠️  LINE channel secret is the placeholder");
    } else {
        println!("✅ LINE channel secret set");
    }
    let token = lib::config::resolve_access_token(&config);
    if token == lib::config::PLACEHOLDER_ACCESS_TOKEN {
        println!("⚠️  LINE access token is the placeholder");
    } else {
        println!("✅ LINE access token set");
    }
    println!("Model: {}", lib::config::resolve_openai_model(&config));
    println!(
        "Listen: {}:{} (debug: {})",
        config.gateway.bind, config.gateway.port, config.gateway.debug
    );
    println!("Categories: {}", lib::config::WASTE_CATEGORIES.join(", "));
    println!("=== CHECK END ===");
    Ok(())
}
