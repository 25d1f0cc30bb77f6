use app::App;
use iced::{Application, Settings};
use optcg_deck_builder::config::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "optcg_deck_builder=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(data_dir = %config.data_dir.display(), "starting deck builder");

    let settings = Settings::with_flags(config);

    App::run(settings)?;
    Ok(())
}
