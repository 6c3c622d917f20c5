use anyhow::Result;
use log::{debug, info, warn};
use std::time::{Duration, Instant};
use winit::{
    event::{Event, WindowEvent},
    event_loop::EventLoop,
    window::WindowBuilder,
};

use combo_input::engine::devices::{DeviceAdapter, KeyboardAdapter, MouseAdapter};
use combo_input::engine::input::{InputEvent, InputManager, InputSettings, JsonFileStore};

const DEFAULT_CONFIG_PATH: &str = "input.json";

/// Bindings used when no saved configuration exists
fn install_default_bindings(input: &mut InputManager) {
    for (action, key) in [
        ("move_up", "w"),
        ("move_up", "up"),
        ("move_down", "s"),
        ("move_down", "down"),
        ("move_left", "a"),
        ("move_left", "left"),
        ("move_right", "d"),
        ("move_right", "right"),
        ("jump", "space"),
        ("jump", "gamepad:button_a"),
        ("attack", "mouse:left"),
        ("attack", "j"),
        ("save", "ctrl+s"),
        ("open_menu", "escape"),
    ] {
        input.add_binding("default", action, key);
    }

    input.add_binding("menu", "menu_up", "up");
    input.add_binding("menu", "menu_down", "down");
    input.add_binding("menu", "confirm", "enter");
    input.add_binding("menu", "back", "escape");
}

/// Feed queued device input, react to a few actions, then advance one frame
fn run_frame(
    input: &mut InputManager,
    keyboard: &mut KeyboardAdapter,
    mouse: &mut MouseAdapter,
    delta: Duration,
) {
    let now = input.now();
    let polled: Vec<_> = keyboard.poll(now).into_iter().chain(mouse.poll(now)).collect();
    for raw in polled {
        let device = raw.device_type.as_str();
        input.process_raw_input(device, raw);
    }

    if input.is_action_just_pressed("open_menu") {
        input.push_context("menu");
    } else if input.is_action_just_pressed("back") {
        input.pop_context();
    }
    if input.is_action_just_pressed("save") {
        input.save_config();
    }

    input.update(delta);

    for event in input.drain_events() {
        match &event {
            InputEvent::ActionHeld { action, value } => debug!("held {} ({:.2})", action, value),
            InputEvent::Error { error, context } => warn!("{}: {}", context, error),
            InputEvent::Combo(combo) => info!(
                "COMBO {} [{}] in {:?}",
                combo.name,
                combo.sequence.join(" > "),
                combo.total_time
            ),
            other => info!("{:?}", other),
        }
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("Starting combo input demo...");

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let mut input =
        InputManager::new(InputSettings::default()).with_store(JsonFileStore::new(&config_path));
    input.initialize()?;
    if !input.load_config(None) {
        info!("No saved bindings at {}, using defaults", config_path);
        install_default_bindings(&mut input);
    }
    input.drain_events();

    input.register_key_combo("hadouken", &["down", "right", "j"], None);
    input.register_key_combo("double_jump", &["space", "space"], Some(Duration::from_millis(300)));

    // Create event loop and window
    let event_loop = EventLoop::new()?;
    let window = WindowBuilder::new()
        .with_title("Combo Input Demo")
        .with_inner_size(winit::dpi::LogicalSize::new(800, 600))
        .with_resizable(true)
        .build(&event_loop)?;

    info!("Window created successfully");

    let mut keyboard = KeyboardAdapter::new();
    let mut mouse = MouseAdapter::new();
    let mut last_frame = Instant::now();

    // Main event loop
    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => {
                    info!("Close requested, shutting down...");
                    input.save_config();
                    input.dispose();
                    elwt.exit();
                }
                WindowEvent::Focused(focused) => {
                    if focused {
                        input.resume();
                    } else {
                        // Keys released while unfocused are never reported
                        input.pause();
                        input.reset();
                    }
                }
                WindowEvent::ModifiersChanged(modifiers) => {
                    keyboard.set_modifiers(modifiers.state());
                    mouse.set_modifiers(modifiers.state());
                }
                WindowEvent::KeyboardInput { event, .. } => keyboard.handle_key_event(&event),
                WindowEvent::MouseInput { state, button, .. } => mouse.handle_button(button, state),
                WindowEvent::MouseWheel { delta, .. } => mouse.handle_scroll(delta),
                WindowEvent::CursorMoved { position, .. } => mouse.handle_cursor_moved(position),
                WindowEvent::CursorLeft { .. } => mouse.cursor_left(),
                WindowEvent::RedrawRequested => {
                    let frame_start = Instant::now();
                    let delta = frame_start - last_frame;
                    last_frame = frame_start;
                    run_frame(&mut input, &mut keyboard, &mut mouse, delta);
                }
                _ => {}
            },
            Event::AboutToWait => {
                // Request redraw on next frame
                window.request_redraw();
            }
            _ => {}
        })
        .map_err(|e| anyhow::anyhow!("Event loop error: {}", e))?;

    Ok(())
}
