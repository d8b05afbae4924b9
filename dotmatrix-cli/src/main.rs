use clap::Parser;
use dotmatrix_core::{HotkeyConfig, InputConfig, RunConfig};
use std::error::Error;

#[derive(Parser)]
#[command(version, about = "A Game Boy (DMG) emulator")]
struct Cli {
    /// Path to the Game Boy ROM file
    #[arg(short = 'f', long = "gb-file-path")]
    gb_file_path: String,
    /// Enable audio output
    #[arg(short = 'a', long = "audio-enabled", default_value_t = false)]
    audio_enabled: bool,
    /// Disable syncing emulation speed to audio playback
    #[arg(long = "no-audio-sync", default_value_t = true, action = clap::ArgAction::SetFalse)]
    sync_to_audio: bool,
    /// Disable VSync
    #[arg(long = "no-vsync", default_value_t = true, action = clap::ArgAction::SetFalse)]
    vsync_enabled: bool,
    /// Launch in fullscreen
    #[arg(long = "fullscreen", default_value_t = false)]
    launch_fullscreen: bool,
    /// Only scale the display area by integer factors
    #[arg(long = "force-integer-scaling", default_value_t = false)]
    force_integer_scaling: bool,
    /// Initial window width in pixels
    #[arg(short = 'w', long = "window-width", default_value_t = 640)]
    window_width: u32,
    /// Initial window height in pixels
    #[arg(short = 'l', long = "window-height", default_value_t = 576)]
    window_height: u32,
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let args = Cli::parse();

    let run_config = RunConfig {
        gb_file_path: args.gb_file_path,
        audio_enabled: args.audio_enabled,
        sync_to_audio: args.sync_to_audio,
        vsync_enabled: args.vsync_enabled,
        launch_fullscreen: args.launch_fullscreen,
        force_integer_scaling: args.force_integer_scaling,
        window_width: args.window_width,
        window_height: args.window_height,
        input_config: InputConfig::default(),
        hotkey_config: HotkeyConfig::default(),
    };

    dotmatrix_core::run(&run_config)
}
