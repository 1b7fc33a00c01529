/// Renderer seam between the engine and whatever draws the game
use std::io;

/// Draws a read-only view of the game. Only the engine loop calls it, never concurrently.
pub trait GameRenderer<V>: Send {
    fn render(&mut self, view: &V) -> io::Result<()>;
}
