use anyhow::Result;
use renderer::{Renderer, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::Args;

pub fn run(args: Args) -> Result<()> {
    initialise_tracing();

    let config = renderer_config(&args);
    tracing::debug!(?config, "resolved renderer config");

    let mut renderer = Renderer::new(config);
    if let Err(err) = renderer.run() {
        tracing::error!("renderer stopped: {err:#}");
        return Err(err);
    }
    Ok(())
}

fn renderer_config(args: &Args) -> RendererConfig {
    RendererConfig {
        fullscreen: args.fullscreen,
        ..RendererConfig::default()
    }
}

fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fullscreen_flag_reaches_config() {
        let config = renderer_config(&Args { fullscreen: true });
        assert!(config.fullscreen);
        assert_eq!(config.window_size, (640, 640));
        assert!(config.vsync);
    }
}
