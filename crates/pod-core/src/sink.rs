//! Rendering of gesture events as Android `input` shell commands.

use crate::types::GestureEvent;

/// The tap lands this many pixels below the cursor so the overlay dot
/// does not swallow it.
pub const TAP_Y_OFFSET: i32 = 80;

/// Swipe duration passed to `input touchscreen swipe`, in milliseconds.
pub const SWIPE_DURATION_MS: u32 = 100;

/// Newline-terminated shell command that replays `event` on the device.
pub fn shell_command(event: &GestureEvent) -> String {
    match event {
        GestureEvent::Press { point } => {
            format!("input tap {} {}\n", point.x, point.y + TAP_Y_OFFSET)
        }
        GestureEvent::Back => "input keyevent KEYCODE_BACK\n".to_string(),
        GestureEvent::Swipe {
            origin,
            destination,
        } => format!(
            "input touchscreen swipe {} {} {} {} {}\n",
            origin.x, origin.y, destination.x, destination.y, SWIPE_DURATION_MS
        ),
    }
}
