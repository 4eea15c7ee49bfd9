use crate::engine::{Aabb, Point, Point3, Rect, Size};
use serde::Deserialize;

// ==================== Camera ====================
// ELI5: a camera on a rail that lazily chases the player
// - every tick it closes 15% of the gap, then stops at the rail's ends
// - background layers slide the other way, slower the farther they are
//
// TABLE:
// ┌───────────────┬───────┬───────┬──────────────────────────────────┐
// │ layer         │ speed │ depth │ feels like                       │
// ├───────────────┼───────┼───────┼──────────────────────────────────┤
// │ farBackground │ 0.1   │ -50   │ distant dunes, barely moves      │
// │ midBackground │ 0.3   │ -25   │ nearer hills                     │
// └───────────────┴───────┴───────┴──────────────────────────────────┘

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayerSpec {
    pub name: String,
    pub image: String,
    pub speed: f32,
    pub depth: f32,
    /// world units, the plane is `2 * levelWidth` wide
    pub height: f32,
    /// world units per image repeat = height * image aspect * scale
    pub scale: f32,
    pub opacity: f32,
    /// vertical gradient (offset, css color) used when the image fails to load
    pub fallback: Vec<(f32, String)>,
}

impl Default for LayerSpec {
    fn default() -> Self {
        LayerSpec {
            name: String::new(),
            image: String::new(),
            speed: 0.0,
            depth: -50.0,
            height: 40.0,
            scale: 1.0,
            opacity: 0.9,
            fallback: vec![(0.0, "#E6D18A".to_string()), (1.0, "#C49A6C".to_string())],
        }
    }
}

fn default_layers() -> Vec<LayerSpec> {
    vec![
        LayerSpec {
            name: "farBackground".into(),
            image: "bg.png".into(),
            speed: 0.1,
            depth: -50.0,
            scale: 1.5,
            fallback: vec![
                (0.0, "#F5E6A3".into()),
                (0.4, "#E6D18A".into()),
                (1.0, "#C49A6C".into()),
            ],
            ..LayerSpec::default()
        },
        LayerSpec {
            name: "midBackground".into(),
            image: "bg2.png".into(),
            speed: 0.3,
            depth: -25.0,
            scale: 1.2,
            fallback: vec![
                (0.0, "#E6D18A".into()),
                (0.6, "#D4A574".into()),
                (1.0, "#B8956A".into()),
            ],
            ..LayerSpec::default()
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    /// fraction of the remaining gap closed per tick
    pub smoothing: f32,
    pub half_viewport_width: f32,
    pub eye_height: f32,
    pub distance: f32,
    pub fov_degrees: f32,
    pub layers: Vec<LayerSpec>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            smoothing: 0.15,
            half_viewport_width: 7.5,
            eye_height: 5.0,
            distance: 15.0,
            fov_degrees: 75.0,
            layers: default_layers(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParallaxLayer {
    pub name: String,
    /// horizontal center of the plane
    pub x: f32,
    pub speed: f32,
    pub depth: f32,
    pub tile_width: f32,
    base_x: f32,
}

impl ParallaxLayer {
    pub fn new(spec: &LayerSpec, level_width: f32) -> Self {
        ParallaxLayer {
            name: spec.name.clone(),
            x: level_width / 2.0,
            speed: spec.speed,
            depth: spec.depth,
            tile_width: level_width * 2.0,
            base_x: level_width / 2.0,
        }
    }

    /// Slide opposite to the camera, wrapping by one tile when far off-screen
    pub fn shift(&mut self, camera_delta: f32) {
        self.x -= camera_delta * self.speed;
        if self.x < -self.tile_width / 2.0 {
            self.x += self.tile_width;
        } else if self.x > self.tile_width * 1.5 {
            self.x -= self.tile_width;
        }
    }

    fn reset(&mut self) {
        self.x = self.base_x;
    }
}

pub struct Camera {
    pub x: f32,
    start_x: f32,
    smoothing: f32,
    min_x: f32,
    max_x: f32,
    layers: Vec<ParallaxLayer>,
}

impl Camera {
    pub fn new(config: &CameraConfig, level_width: f32, start_x: f32) -> Self {
        let min_x = config.half_viewport_width;
        // a level narrower than the viewport pins the camera to its middle
        let max_x = (level_width - config.half_viewport_width).max(min_x);
        Camera {
            x: start_x,
            start_x,
            smoothing: config.smoothing.clamp(0.0, 1.0),
            min_x,
            max_x,
            layers: config
                .layers
                .iter()
                .map(|spec| ParallaxLayer::new(spec, level_width))
                .collect(),
        }
    }

    pub fn layers(&self) -> &[ParallaxLayer] {
        &self.layers
    }

    /// Ease toward `target_x`, clamp, then drag the layers along
    /// - returns how far the camera moved this tick
    pub fn follow(&mut self, target_x: f32) -> f32 {
        let previous = self.x;
        self.x += (target_x - self.x) * self.smoothing;
        self.x = self.x.clamp(self.min_x, self.max_x);
        let delta = self.x - previous;
        for layer in self.layers.iter_mut() {
            layer.shift(delta);
        }
        delta
    }

    pub fn reset(&mut self) {
        self.x = self.start_x;
        self.layers.iter_mut().for_each(ParallaxLayer::reset);
    }
}

// ==================== Viewport ====================
// pinhole projection from world units to canvas pixels
// - eye sits at (camera.x, eye_height, distance) looking down -z
// - the same mapping serves drawing and tap hit-tests
const NEAR: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub camera_x: f32,
    eye_height: f32,
    distance: f32,
    focal: f32,
    screen: Size,
}

impl Viewport {
    pub fn new(config: &CameraConfig, camera_x: f32, screen: Size) -> Self {
        let half_fov = (config.fov_degrees.clamp(1.0, 179.0) / 2.0).to_radians();
        Viewport {
            camera_x,
            eye_height: config.eye_height,
            distance: config.distance,
            focal: (screen.height / 2.0) / half_fov.tan(),
            screen,
        }
    }

    pub fn screen(&self) -> Size {
        self.screen
    }

    /// Pixels per world unit at depth `z`
    pub fn scale_at(&self, z: f32) -> f32 {
        self.focal / (self.distance - z).max(NEAR)
    }

    pub fn project(&self, point: Point3) -> Point {
        let scale = self.scale_at(point.z);
        Point {
            x: self.screen.width / 2.0 + (point.x - self.camera_x) * scale,
            y: self.screen.height / 2.0 - (point.y - self.eye_height) * scale,
        }
    }

    pub fn project_bounds(&self, bounds: &Aabb, z: f32) -> Rect {
        let scale = self.scale_at(z);
        let top_left = self.project(Point3::new(bounds.min_x, bounds.max_y, z));
        Rect::new(
            top_left,
            Size {
                width: bounds.width() * scale,
                height: bounds.height() * scale,
            },
        )
    }
}
