//! Software framebuffer renderer
//!
//! Draws the playfield into a 256x240 `0x00RRGGBB` buffer. Text lives in the
//! front-end; the framebuffer only carries coloured bars for the HUD.

use retroplay_shared::game_state::{GameState, SCREEN_HEIGHT, SCREEN_WIDTH};

use crate::hud::HudStatus;
use crate::runtime::rules::{BULLET_SIZE, ENEMY_SIZE, PLAYER_SIZE};

pub const WIDTH: usize = SCREEN_WIDTH as usize;
pub const HEIGHT: usize = SCREEN_HEIGHT as usize;

pub const BLACK: u32 = 0x000000;
pub const WHITE: u32 = 0xFFFFFF;
pub const GREEN: u32 = 0x00FF00;
pub const YELLOW: u32 = 0xFFFF00;
pub const CYAN: u32 = 0x00FFFF;
const GRID: u32 = 0x141414;
const ENEMY_COLORS: [u32; 3] = [0xFF0000, 0xFF8000, 0xFF00FF];

const GRID_CELL: usize = 32;
const BAR_HEIGHT: i32 = 4;

/// One frame of pixels
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u32>,
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    pub fn new() -> Self {
        Self {
            pixels: vec![BLACK; WIDTH * HEIGHT],
        }
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < WIDTH && y < HEIGHT).then(|| self.pixels[y * WIDTH + x])
    }

    pub fn clear(&mut self, color: u32) {
        self.pixels.fill(color);
    }

    /// Fill a rectangle, clipped to the screen
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let x0 = x.clamp(0, SCREEN_WIDTH) as usize;
        let y0 = y.clamp(0, SCREEN_HEIGHT) as usize;
        let x1 = x.saturating_add(w).clamp(0, SCREEN_WIDTH) as usize;
        let y1 = y.saturating_add(h).clamp(0, SCREEN_HEIGHT) as usize;
        if x0 >= x1 {
            return;
        }
        for row in y0..y1 {
            self.pixels[row * WIDTH + x0..row * WIDTH + x1].fill(color);
        }
    }
}

/// Draw `state` and the HUD bars into `frame`.
pub fn draw(frame: &mut Frame, state: &GameState, hud: &HudStatus) {
    frame.clear(BLACK);

    for gx in (0..WIDTH).step_by(GRID_CELL) {
        for gy in (0..HEIGHT).step_by(GRID_CELL) {
            if (gx + gy) % (GRID_CELL * 2) == 0 {
                frame.fill_rect(gx as i32, gy as i32, GRID_CELL as i32, GRID_CELL as i32, GRID);
            }
        }
    }

    let player = if hud.paused { YELLOW } else { GREEN };
    frame.fill_rect(state.player_x, state.player_y, PLAYER_SIZE, PLAYER_SIZE, player);
    frame.fill_rect(
        state.player_x.saturating_add(5),
        state.player_y.saturating_add(5),
        10,
        10,
        WHITE,
    );

    for enemy in &state.enemies {
        let color = ENEMY_COLORS[enemy.kind as usize % ENEMY_COLORS.len()];
        frame.fill_rect(enemy.x, enemy.y, ENEMY_SIZE, ENEMY_SIZE, color);
    }

    for bullet in &state.bullets {
        frame.fill_rect(bullet.x, bullet.y, BULLET_SIZE, BULLET_SIZE, YELLOW);
    }

    draw_bars(frame, hud);
}

/// Lives along the top-left, cheats and pads along the bottom.
fn draw_bars(frame: &mut Frame, hud: &HudStatus) {
    for i in 0..hud.lives.min(10) as i32 {
        frame.fill_rect(2 + i * 6, 2, BAR_HEIGHT, BAR_HEIGHT, GREEN);
    }

    let bottom = SCREEN_HEIGHT - BAR_HEIGHT - 2;
    for i in 0..hud.cheats_enabled.min(20) as i32 {
        frame.fill_rect(2 + i * 6, bottom, BAR_HEIGHT, BAR_HEIGHT, YELLOW);
    }
    for i in 0..hud.controllers.min(8) as i32 {
        frame.fill_rect(SCREEN_WIDTH - 6 - i * 6, bottom, BAR_HEIGHT, BAR_HEIGHT, CYAN);
    }

    if hud.autosaved {
        frame.fill_rect(SCREEN_WIDTH - 6, 2, BAR_HEIGHT, BAR_HEIGHT, WHITE);
    }
}
