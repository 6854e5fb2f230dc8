//! Static pool of pre-written tasks used when generation under-produces.

/// A pre-written task. Pool order matters: backfill walks the pool front to
/// back and takes the first entries whose titles are not already in use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackTask {
    pub title: &'static str,
    pub total_count: i64,
}

const fn task(title: &'static str, total_count: i64) -> FallbackTask {
    FallbackTask { title, total_count }
}

pub const FALLBACK_TASKS: [FallbackTask; 12] = [
    task("Capture a sunrise or sunset", 1),
    task("Photograph your morning coffee or tea", 1),
    task("Take a photo of something red", 1),
    task("Snap your favorite corner at home", 1),
    task("Capture an interesting shadow", 1),
    task("Photograph a plant or flower up close", 1),
    task("Take three photos of textures around you", 3),
    task("Capture a reflection in water or glass", 1),
    task("Photograph the view from a window", 1),
    task("Take a photo of something older than you", 1),
    task("Capture two contrasting colors side by side", 2),
    task("Photograph a street sign in your neighborhood", 1),
];

// Backfill must always be able to produce a full day's set on its own.
const _: () = assert!(FALLBACK_TASKS.len() >= 3, "fallback pool too small");
