use crate::ppu::{self, PpuState};
use crate::RunConfig;
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Texture, TextureCreator, TextureValueError, WindowCanvas};
use sdl2::video::{FullscreenType, Window, WindowContext};
use sdl2::IntegerOrSdlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphicsError {
    #[error("error setting fullscreen mode: {msg}")]
    Fullscreen { msg: String },
    #[error("error creating renderer: {source}")]
    CreateRenderer {
        #[from]
        source: IntegerOrSdlError,
    },
    #[error("error creating frame texture: {source}")]
    CreateTexture {
        #[from]
        source: TextureValueError,
    },
    #[error("error updating frame texture: {msg}")]
    Texture { msg: String },
    #[error("error copying frame texture to renderer: {msg}")]
    CopyToCanvas { msg: String },
}

/// Create an SDL2 renderer from the given SDL2 window, optionally with VSync
/// and fullscreen applied from the config.
pub fn create_renderer(
    mut window: Window,
    run_config: &RunConfig,
) -> Result<WindowCanvas, GraphicsError> {
    if run_config.launch_fullscreen {
        window
            .set_fullscreen(FullscreenType::Desktop)
            .map_err(|msg| GraphicsError::Fullscreen { msg })?;
    }

    let mut canvas_builder = window.into_canvas();
    if run_config.vsync_enabled {
        canvas_builder = canvas_builder.present_vsync();
    }

    let mut canvas = canvas_builder.build()?;

    canvas.set_draw_color(Color::RGB(0, 0, 0));
    canvas.clear();
    canvas.present();

    Ok(canvas)
}

/// Create the 160x144 streaming texture that frames are copied into.
pub fn create_frame_texture(
    texture_creator: &TextureCreator<WindowContext>,
) -> Result<Texture<'_>, GraphicsError> {
    let texture = texture_creator.create_texture_streaming(
        PixelFormatEnum::ARGB8888,
        ppu::SCREEN_WIDTH as u32,
        ppu::SCREEN_HEIGHT as u32,
    )?;
    Ok(texture)
}

/// Render the current frame to the SDL2 window, overwriting all previously
/// displayed data.
///
/// With VSync enabled this function will block until the next screen refresh.
pub fn render_frame(
    ppu_state: &PpuState,
    canvas: &mut WindowCanvas,
    texture: &mut Texture<'_>,
    run_config: &RunConfig,
) -> Result<(), GraphicsError> {
    let frame_buffer = ppu_state.frame_buffer();

    texture
        .with_lock(None, |pixels, pitch| {
            for (i, scanline) in frame_buffer.iter().enumerate() {
                for (j, argb) in scanline.iter().copied().enumerate() {
                    let start = i * pitch + 4 * j;
                    pixels[start..start + 4].copy_from_slice(&argb.to_ne_bytes());
                }
            }
        })
        .map_err(|msg| GraphicsError::Texture { msg })?;

    let dst_rect = if run_config.force_integer_scaling {
        let (w, h) = canvas.window().size();
        determine_integer_scale_rect(w, h)
    } else {
        None
    };

    canvas.set_draw_color(Color::RGB(0, 0, 0));
    canvas.clear();
    canvas.copy(texture, None, dst_rect).map_err(|msg| GraphicsError::CopyToCanvas { msg })?;
    canvas.present();

    Ok(())
}

fn determine_integer_scale_rect(w: u32, h: u32) -> Option<Rect> {
    let screen_width = ppu::SCREEN_WIDTH as u32;
    let screen_height = ppu::SCREEN_HEIGHT as u32;

    let Some(scale) = (1..)
        .take_while(|&scale| scale * screen_width <= w && scale * screen_height <= h)
        .last()
    else {
        // Give up, display area is too small for 1x scale
        return None;
    };

    let scaled_width = scale * screen_width;
    let scaled_height = scale * screen_height;
    Some(Rect::new(
        ((w - scaled_width) / 2) as i32,
        ((h - scaled_height) / 2) as i32,
        scaled_width,
        scaled_height,
    ))
}

pub fn toggle_fullscreen(canvas: &mut WindowCanvas) -> Result<(), GraphicsError> {
    let current_fullscreen = canvas.window().fullscreen_state();
    let new_fullscreen = match current_fullscreen {
        FullscreenType::Off => FullscreenType::Desktop,
        FullscreenType::True | FullscreenType::Desktop => FullscreenType::Off,
    };
    canvas
        .window_mut()
        .set_fullscreen(new_fullscreen)
        .map_err(|msg| GraphicsError::Fullscreen { msg })
}
