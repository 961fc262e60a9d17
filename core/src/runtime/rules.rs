//! Per-tick game rules for the stand-in arcade shooter

use retroplay_shared::game_state::{Bullet, Enemy, GameState, SCREEN_HEIGHT, SCREEN_WIDTH};

use crate::input::ControlState;

/// Pixels the player moves per tick
pub const PLAYER_SPEED: i32 = 3;
/// Player sprite edge length
pub const PLAYER_SIZE: i32 = 20;
/// Enemy sprite edge length
pub const ENEMY_SIZE: i32 = 15;
/// Bullet sprite edge length
pub const BULLET_SIZE: i32 = 5;

const PLAYER_MIN: i32 = 10;
const PLAYER_MAX_X: i32 = SCREEN_WIDTH - 30;
const PLAYER_MAX_Y: i32 = SCREEN_HEIGHT - 30;
const ENEMY_EDGE: i32 = 10;
const ENEMY_MAX_X: i32 = SCREEN_WIDTH - 20;
const ENEMY_MAX_Y: i32 = SCREEN_HEIGHT - 20;

const FIRE_EVERY: u64 = 10;
const BULLET_SPEED: i32 = 5;
const HIT_RADIUS: u32 = 15;
const HIT_SCORE: u32 = 10;
const MIN_ENEMIES: usize = 3;
const LEVEL_CHECK_EVERY: u64 = 60;
const POINTS_PER_LEVEL: u32 = 100;

/// Advance one tick. Paused ticks only count the frame.
pub fn tick(state: &mut GameState, controls: ControlState, paused: bool) {
    if !paused {
        update(state, controls);
    }
    state.frame_count = state.frame_count.saturating_add(1);
}

fn update(state: &mut GameState, controls: ControlState) {
    // Cheats and loaded saves can put the player anywhere in i32 range
    let step = |pos: i32, delta: i32, max: i32| pos.saturating_add(delta).clamp(PLAYER_MIN, max);
    if controls.left {
        state.player_x = step(state.player_x, -PLAYER_SPEED, PLAYER_MAX_X);
    }
    if controls.right {
        state.player_x = step(state.player_x, PLAYER_SPEED, PLAYER_MAX_X);
    }
    if controls.up {
        state.player_y = step(state.player_y, -PLAYER_SPEED, PLAYER_MAX_Y);
    }
    if controls.down {
        state.player_y = step(state.player_y, PLAYER_SPEED, PLAYER_MAX_Y);
    }

    if controls.a && state.frame_count % FIRE_EVERY == 0 {
        state.bullets.push(Bullet {
            x: state.player_x.saturating_add(15),
            y: state.player_y,
            dx: BULLET_SPEED,
            dy: 0,
        });
    }

    for bullet in &mut state.bullets {
        bullet.x = bullet.x.saturating_add(bullet.dx);
        bullet.y = bullet.y.saturating_add(bullet.dy);
    }
    state.bullets.retain(|b| (0..=SCREEN_WIDTH).contains(&b.x));

    for enemy in &mut state.enemies {
        enemy.x = enemy.x.saturating_add(enemy.dx);
        enemy.y = enemy.y.saturating_add(enemy.dy);
        if enemy.x <= ENEMY_EDGE || enemy.x >= ENEMY_MAX_X {
            enemy.dx = enemy.dx.saturating_neg();
        }
        if enemy.y <= ENEMY_EDGE || enemy.y >= ENEMY_MAX_Y {
            enemy.dy = enemy.dy.saturating_neg();
        }
    }

    resolve_hits(state);

    if state.enemies.len() < MIN_ENEMIES {
        let n = state.enemies.len();
        state.enemies.push(Enemy {
            x: ENEMY_MAX_X,
            y: 50 + (n as i32 % 3) * 50,
            dx: -1,
            dy: 0,
            kind: (n % 3) as u8,
        });
    }

    if state.score > 0
        && state.score % POINTS_PER_LEVEL == 0
        && state.frame_count % LEVEL_CHECK_EVERY == 0
    {
        state.level = state.score / POINTS_PER_LEVEL + 1;
    }
}

/// Each bullet takes out at most one enemy.
fn resolve_hits(state: &mut GameState) {
    let mut i = 0;
    while i < state.bullets.len() {
        let bullet = state.bullets[i];
        let hit = state.enemies.iter().position(|e| {
            bullet.x.abs_diff(e.x) < HIT_RADIUS && bullet.y.abs_diff(e.y) < HIT_RADIUS
        });
        match hit {
            Some(e) => {
                state.bullets.remove(i);
                state.enemies.remove(e);
                state.score = state.score.saturating_add(HIT_SCORE);
            }
            None => i += 1,
        }
    }
}
