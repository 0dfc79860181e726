//! 構造化ログの初期化。
//! tracing-subscriber を使用し、JSON またはテキスト形式で出力する。

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 環境名から既定のフィルタ指定を決める。
///
/// - dev: debug
/// - staging: info
/// - それ以外: warn
pub fn default_filter(environment: &str) -> &'static str {
    match environment {
        "dev" => "debug",
        "staging" => "info",
        _ => "warn",
    }
}

/// init_logger は tracing-subscriber を初期化する。
/// `RUST_LOG` が設定されていればそれを優先する。format が "text" ならプレーンテキスト、それ以外は JSON。
pub fn init_logger(environment: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(environment)));
    let registry = tracing_subscriber::registry().with(filter);

    if format == "text" {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE),
            )
            .init();
    }
}
