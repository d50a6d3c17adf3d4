pub mod layout;
pub mod render;
pub mod text;

pub use ab_glyph::FontVec;

pub use layout::{Bounds, Button, Hit, ScreenLayout};
pub use render::{FrameStats, SceneRenderer, SkiaRenderer};
pub use text::{box_blur, load_font, render_text_pixmap};
