//! Orrery demo application
//!
//! Opens a window, builds the shader programs and scene from the configured
//! resource tree, and renders until the window closes. Keyboard controls are
//! listed in `orrery_engine::controls`.
//!
//! Usage: `orrery [config.toml|config.ron]`

use std::rc::Rc;

use orrery_engine::backend::opengl::{GlDevice, GlShader, GlfwWindow};
use orrery_engine::config::ConfigError;
use orrery_engine::prelude::*;
use orrery_engine::render::WindowError;
use thiserror::Error;

const DEFAULT_CONFIG: &str = "orrery.toml";

/// Startup failures; nothing after the first frame is fatal
#[derive(Error, Debug)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("window: {0}")]
    Window(#[from] WindowError),
    #[error("renderer: {0}")]
    Render(#[from] RenderError),
}

fn run(config_path: &str) -> Result<u64, DemoError> {
    let config = OrreryConfig::load_or_default(config_path)?;
    config.validate()?;
    log::info!("Configuration loaded from {config_path} (or defaults)");

    let mut window = GlfwWindow::new(&config.window)?;
    let gl = Rc::new(window.load_gl());
    let device: Rc<dyn GraphicsDevice> = Rc::new(GlDevice::new(Rc::clone(&gl)));

    let shader_dir = config.resources.resolve(&config.resources.shader_dir);
    let shaders = ShaderLibrary::load_all(&shader_dir, |id, vertex, fragment| {
        let program = GlShader::from_files(Rc::clone(&gl), id, vertex, fragment)?;
        Ok(Box::new(program) as Box<dyn ShaderProgram>)
    });

    let mut scene = SceneState::load(&device, &config);
    let mut settings = RenderSettings::default();
    let mut controls = ControlPanel::new();
    let mut frames = FrameOrchestrator::new(Rc::clone(&device), shaders, &config)?;

    let rendered = frames.run(&mut scene, &mut settings, &mut window, |events, scene, settings| {
        controls.apply(events, scene, settings);
    });

    // GPU objects go before the context
    drop(scene);
    drop(frames);
    Ok(rendered)
}

fn main() {
    orrery_engine::foundation::logging::init_with_level(log::LevelFilter::Info);

    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    log::info!("Starting Orrery");

    match run(&config_path) {
        Ok(frames) => log::info!("Exited cleanly after {frames} frames"),
        Err(e) => {
            log::error!("Orrery failed to start: {e}");
            std::process::exit(1);
        }
    }
}
