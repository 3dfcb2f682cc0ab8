//! NES emulator entry point.
//!
//! Loads a cartridge and runs frame after frame into a display window.
//! Usage: ferricom [path/to/game.nes]

use std::env;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use ferricom::cartridge::cartridge::Cartridge;
use ferricom::diag;
use ferricom::nes::Nes;
use ferricom::ppu::ppu::{HEIGHT, WIDTH};
use ferricom::ppu::Screen;
use minifb::{Key, Window, WindowOptions};

/// NES runs at ~60.0988 Hz (NTSC). Pace to one frame per 16.67 ms.
const FRAME_DURATION: Duration = Duration::from_nanos(16_666_667);

/// Window-backed display collaborator: holds the latest presented frame.
struct WindowScreen {
    frame: Vec<u32>,
}

impl Screen for WindowScreen {
    fn blit(&mut self, buffer: &[u32], width: usize, height: usize) {
        debug_assert_eq!(buffer.len(), width * height);
        self.frame.copy_from_slice(buffer);
    }
}

fn main() -> ExitCode {
    let path = env::args().nth(1).unwrap_or_else(|| "test/nestest.nes".to_string());

    let cart = match Cartridge::load(&path) {
        Ok(cart) => cart,
        Err(e) => {
            diag::error(&format!("{e}"));
            return ExitCode::FAILURE;
        }
    };
    let mut nes = match Nes::new(cart) {
        Ok(nes) => nes,
        Err(e) => {
            diag::error(&format!("{e}"));
            return ExitCode::FAILURE;
        }
    };

    let mut window = Window::new(
        "Ferricom",
        WIDTH,
        HEIGHT,
        WindowOptions {
            resize: true,
            scale: minifb::Scale::FitScreen,
            scale_mode: minifb::ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        },
    )
    .expect("Failed to create window");
    window.set_target_fps(60);

    let mut screen = WindowScreen { frame: vec![0; WIDTH * HEIGHT] };

    while window.is_open() && !window.is_key_down(Key::Escape) {
        let frame_start = Instant::now();

        if nes.run_frame(&mut screen).is_err() {
            break; // CPU halted; diagnostics already printed
        }

        window
            .update_with_buffer(&screen.frame, WIDTH, HEIGHT)
            .expect("Failed to update window");

        // emulation outruns the real console by a wide margin
        let elapsed = frame_start.elapsed();
        if elapsed < FRAME_DURATION {
            std::thread::sleep(FRAME_DURATION - elapsed);
        }
    }
    ExitCode::SUCCESS
}
