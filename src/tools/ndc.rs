//! Screen-space to normalized device coordinate conversion.

use bevy::prelude::*;

/// Convert a window-space pixel position to normalized device coordinates.
///
/// Both axes map to `[-1, 1]`. The vertical axis is flipped: the top edge of
/// the viewport is `+1` and the bottom edge is `-1`.
pub fn screen_to_ndc(screen: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new(
        (screen.x / viewport.x) * 2.0 - 1.0,
        -(screen.y / viewport.y) * 2.0 + 1.0,
    )
}

/// Inverse of [`screen_to_ndc`].
pub fn ndc_to_screen(ndc: Vec2, viewport: Vec2) -> Vec2 {
    Vec2::new(
        (ndc.x + 1.0) * 0.5 * viewport.x,
        (1.0 - ndc.y) * 0.5 * viewport.y,
    )
}
