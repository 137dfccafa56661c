#[cfg(not(target_arch = "wasm32"))]
use terrain_walker::{
    config::SimConfig,
    flow::{self, WindowSurface},
    resources,
};

/// Usage: `terrain-walker [settings.toml]`. The settings file and every asset are read from
/// `./assets`.
#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(file) => tokio::runtime::Runtime::new()?.block_on(resources::load_config(&file))?,
        None => SimConfig::default(),
    };
    flow::run(config, Box::new(|window| Box::new(WindowSurface::new(window))))
}

// The browser enters through `flow::start`.
#[cfg(target_arch = "wasm32")]
fn main() {}
