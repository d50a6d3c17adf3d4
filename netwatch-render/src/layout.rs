use netwatch_core::{Classification, InfoField};
use netwatch_session::PanelDirection;
use tiny_skia::Rect;

/// Axis-aligned box in window pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Bounds {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self {
            x,
            y,
            w: w.max(0.0),
            h: h.max(0.0),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.w * 0.5, self.y + self.h * 0.5)
    }

    pub fn contains(&self, px: f32, py: f32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    pub fn to_rect(&self) -> Option<Rect> {
        Rect::from_xywh(self.x, self.y, self.w, self.h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Classify(Classification),
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Packet(usize),
    Button(Button),
}

/// Share of the window width given to the game area
const GAME_SHARE: f32 = 0.6;
/// Upper bound on the game area height, as a share of the window height
const GAME_MAX_HEIGHT: f32 = 0.6;

/// Placement of every element of the trial screen for one window size
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenLayout {
    pub width: u32,
    pub height: u32,
    pub game: Bounds,
    pub panel: Bounds,
    pub info_rows: [Bounds; 8],
    pub advice: Bounds,
    pub buttons: [(Button, Bounds); 4],
    pub dot_radius: f32,
    pub text_px: f32,
}

impl ScreenLayout {
    pub fn compute(width: u32, height: u32, direction: PanelDirection) -> Self {
        let (w, h) = (width as f32, height as f32);
        let margin = (w.min(h) * 0.02).max(4.0);

        let game_w = w * GAME_SHARE - margin * 1.5;
        let panel_w = w - game_w - margin * 3.0;
        let inner_h = h - margin * 2.0;

        let (game_x, panel_x) = match direction {
            PanelDirection::Standard => (margin, margin * 2.0 + game_w),
            PanelDirection::Reversed => (margin * 2.0 + panel_w, margin),
        };
        let game = Bounds::new(game_x, margin, game_w, inner_h.min(h * GAME_MAX_HEIGHT));
        let panel = Bounds::new(panel_x, margin, panel_w, inner_h);

        let pad = margin;
        let row_h = inner_h * 0.06;
        let row_w = panel.w - pad * 2.0;
        let info_rows = std::array::from_fn(|i| {
            Bounds::new(panel.x + pad, panel.y + pad + row_h * i as f32, row_w, row_h)
        });

        let advice_y = panel.y + pad * 2.0 + row_h * InfoField::ALL.len() as f32;
        let advice = Bounds::new(panel.x + pad, advice_y, row_w, row_h * 2.0);

        let button_h = row_h * 1.2;
        let buttons_y = advice.bottom() + pad;
        let third = (row_w - pad * 2.0) / 3.0;
        let classify = |i: usize, kind| {
            (
                Button::Classify(kind),
                Bounds::new(
                    panel.x + pad + (third + pad) * i as f32,
                    buttons_y,
                    third,
                    button_h,
                ),
            )
        };
        let buttons = [
            classify(0, Classification::Trusted),
            classify(1, Classification::Suspect),
            classify(2, Classification::Hostile),
            (
                Button::Accept,
                Bounds::new(panel.x + pad, buttons_y + button_h + pad, row_w, button_h),
            ),
        ];

        Self {
            width,
            height,
            game,
            panel,
            info_rows,
            advice,
            buttons,
            dot_radius: (w.min(h) * 0.012).max(6.0),
            text_px: (row_h * 0.55).max(10.0),
        }
    }

    pub fn info_row(&self, field: InfoField) -> Bounds {
        self.info_rows[field.row()]
    }

    /// Game-area percent to window pixels
    pub fn to_screen(&self, percent: [f32; 2]) -> (f32, f32) {
        (
            self.game.x + self.game.w * percent[0] / 100.0,
            self.game.y + self.game.h * percent[1] / 100.0,
        )
    }

    pub fn button(&self, button: Button) -> Option<Bounds> {
        self.buttons
            .iter()
            .find(|(b, _)| *b == button)
            .map(|(_, bounds)| *bounds)
    }

    /// Resolves a click. Dots are tested topmost first; `dots` yields
    /// `(index, percent position)` for packets currently on screen.
    pub fn hit_test<I>(&self, px: f32, py: f32, dots: I, accept_visible: bool) -> Option<Hit>
    where
        I: IntoIterator<Item = (usize, [f32; 2])>,
    {
        if self.game.contains(px, py) {
            let reach = self.dot_radius * 1.5;
            return dots
                .into_iter()
                .filter(|(_, pos)| {
                    let (cx, cy) = self.to_screen(*pos);
                    (cx - px).powi(2) + (cy - py).powi(2) <= reach * reach
                })
                .last()
                .map(|(i, _)| Hit::Packet(i));
        }
        self.buttons
            .iter()
            .filter(|(b, _)| accept_visible || *b != Button::Accept)
            .find(|(_, bounds)| bounds.contains(px, py))
            .map(|(b, _)| Hit::Button(*b))
    }
}
