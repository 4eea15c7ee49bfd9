// TABLE:
// ┌──────────────────────────────────────────────────────────────────────────┐
// │                      Directory Structure Analogy                         │
// ├───────────────────┬──────────────────────────────────────────────────────┤
// │ Code Directory    │          Photoshop Equivalent                        │
// ├───────────────────┼──────────────────────────────────────────────────────┤
// │ sprite/           │ Character Asset Library                              │
// │ ├── mod.rs        │ Master Sprite Sheet Settings (.psd) + Timeline       │
// │ ├── state.rs      │ Which Layer Group is visible right now               │
// │ └── billboard.rs  │ Export the visible frame onto a card in the 3D set   │
// └───────────────────┴──────────────────────────────────────────────────────┘
// ┌──────────────────────────────────────────────────────────────────────────┐
// │                      Code Structure vs Photoshop Concepts                │
// ├────────────────┬──────────────────────┬──────────────────────────────────┤
// │   Code File    │   Code Component     │         Photoshop Equivalent     │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │                │ SpriteSheetGrid      │ Canvas split into equal cells    │
// │   mod.rs       │ Clip + ClipRegistry  │ Named frame sequences            │
// │                │ SpritePlayer         │ Timeline playhead                │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │                │ CharacterState       │ Flags the level raises           │
// │   state.rs     │ AnimationState       │ "Walk"/"Jump"/... layer groups   │
// │                │ select()             │ Rule picking the visible group   │
// ├────────────────┼──────────────────────┼──────────────────────────────────┤
// │ billboard.rs   │ SpriteBillboard      │ Smart object placed in the scene │
// └────────────────┴──────────────────────┴──────────────────────────────────┘
use crate::engine::Rect;
use crate::lifecycle::SessionError;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;

pub mod billboard;
pub mod state;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClipName {
    Idle,
    Walk,
    Run,
    Jump,
    Fall,
    Hit,
    Collect,
    Victory,
    Death,
}

impl ClipName {
    pub fn name(self) -> &'static str {
        match self {
            ClipName::Idle => "idle",
            ClipName::Walk => "walk",
            ClipName::Run => "run",
            ClipName::Jump => "jump",
            ClipName::Fall => "fall",
            ClipName::Hit => "hit",
            ClipName::Collect => "collect",
            ClipName::Victory => "victory",
            ClipName::Death => "death",
        }
    }
}

/// A named run of sheet frames
/// - `frame_ms` is how long each frame stays up
/// - a non looping clip holds its last frame once done
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub frames: Vec<usize>,
    pub frame_ms: u32,
    pub looping: bool,
}

impl Clip {
    pub fn new(frames: &[usize], frame_ms: u32, looping: bool) -> Self {
        Clip {
            frames: frames.to_vec(),
            frame_ms,
            looping,
        }
    }

    /// Single frame clips never advance
    pub fn is_static(&self) -> bool {
        self.frames.len() <= 1
    }
}

#[derive(Debug, Default)]
pub struct ClipRegistry {
    clips: HashMap<ClipName, Clip>,
}

impl ClipRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, name: ClipName, clip: Clip) -> Self {
        self.clips.insert(name, clip);
        self
    }

    pub fn get(&self, name: ClipName) -> Result<&Clip, SessionError> {
        self.clips
            .get(&name)
            .ok_or_else(|| SessionError::Tick(format!("no animation clip named {}", name.name())))
    }

    /// Highest sheet frame any clip refers to
    pub fn max_frame(&self) -> Option<usize> {
        self.clips
            .values()
            .flat_map(|clip| clip.frames.iter().copied())
            .max()
    }
}

// 8 poses over a 4 x 2 sheet
// ┌───────┬───────┬───────┬───────┐
// │ 0     │ 1     │ 2     │ 3     │  stand, stride...
// ├───────┼───────┼───────┼───────┤
// │ 4     │ 5     │ 6     │ 7     │  ...stride, hurt
// └───────┴───────┴───────┴───────┘
pub static JOURNEY_CLIPS: Lazy<ClipRegistry> = Lazy::new(|| {
    ClipRegistry::new()
        .register(ClipName::Idle, Clip::new(&[0], 1000, true))
        .register(ClipName::Walk, Clip::new(&[1, 2, 3, 4], 200, true))
        .register(ClipName::Run, Clip::new(&[1, 2, 3, 4, 5, 6], 120, true))
        .register(ClipName::Jump, Clip::new(&[3, 4], 200, true))
        .register(ClipName::Fall, Clip::new(&[4, 5], 200, true))
        .register(ClipName::Hit, Clip::new(&[7], 300, false))
        .register(ClipName::Collect, Clip::new(&[2, 3], 200, false))
        .register(ClipName::Victory, Clip::new(&[3, 4, 3, 4], 300, true))
        .register(ClipName::Death, Clip::new(&[7, 6, 1], 400, false))
});

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpriteSheetGrid {
    pub image: String,
    pub cell_width: f32,
    pub cell_height: f32,
    pub columns: usize,
    pub frames: usize,
}

impl Default for SpriteSheetGrid {
    fn default() -> Self {
        SpriteSheetGrid {
            image: "poses.png".to_string(),
            cell_width: 256.0,
            cell_height: 512.0,
            columns: 4,
            frames: 8,
        }
    }
}

impl SpriteSheetGrid {
    /// Sub-rectangle of frame `index`, counted row by row from the top left
    pub fn frame_rect(&self, index: usize) -> Option<Rect> {
        if index >= self.frames || self.columns == 0 {
            return None;
        }
        let column = index % self.columns;
        let row = index / self.columns;
        Some(Rect::new_from_x_y(
            column as f32 * self.cell_width,
            row as f32 * self.cell_height,
            self.cell_width,
            self.cell_height,
        ))
    }
}

/// Playhead over one clip
/// - time is fed in milliseconds, one `engine::FRAME_SIZE` per tick
#[derive(Debug, Clone)]
pub struct SpritePlayer {
    clip: Clip,
    cursor: usize,
    elapsed_ms: f32,
    playing: bool,
}

impl SpritePlayer {
    pub fn new(clip: &Clip) -> Self {
        let mut player = SpritePlayer {
            clip: clip.clone(),
            cursor: 0,
            elapsed_ms: 0.0,
            playing: false,
        };
        player.play(clip);
        player
    }

    /// Restart from the first frame of `clip`
    pub fn play(&mut self, clip: &Clip) {
        self.clip = clip.clone();
        self.cursor = 0;
        self.elapsed_ms = 0.0;
        self.playing = !clip.is_static();
    }

    pub fn advance(&mut self, delta_ms: f32) {
        if !self.playing {
            return;
        }
        self.elapsed_ms += delta_ms;
        if self.elapsed_ms < self.clip.frame_ms as f32 {
            return;
        }
        self.elapsed_ms = 0.0;
        self.cursor += 1;
        if self.cursor >= self.clip.frames.len() {
            if self.clip.looping {
                self.cursor = 0;
            } else {
                self.cursor = self.clip.frames.len().saturating_sub(1);
                self.playing = false;
            }
        }
    }

    /// Sheet frame currently showing
    pub fn frame(&self) -> usize {
        self.clip.frames.get(self.cursor).copied().unwrap_or(0)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }
}
