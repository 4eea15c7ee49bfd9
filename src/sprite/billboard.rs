use crate::browser;
use crate::engine::{Aabb, Backdrop, Point3, Rect, Size};
use crate::lifecycle::SessionError;
use crate::physics::Facing;
use crate::sprite::SpriteSheetGrid;
use anyhow::{anyhow, Result};
use serde::Deserialize;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

// ELI5: a flip book page glued onto a cardboard cutout
// - every tick the current page is copied onto a fresh off-screen canvas
// - the canvas is the "texture", the cutout stands where the player is
// - facing left mirrors the page, never the cutout
//
// ┌─────────── 1024 x 1024 texture ───────────┐
// │        ┌───────── 620 x 820 ─────────┐    │
// │        │  halo  ┌── 600 x 800 ──┐    │    │
// │        │        │    frame      │    │    │
// │        │        └───────────────┘    │    │
// │        └─────────────────────────────┘    │
// └───────────────────────────────────────────┘
const HALO_COLOR: &str = "rgba(255, 255, 255, 0.15)";
const HALO_PADDING: f32 = 10.0;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BillboardConfig {
    pub texture_size: u32,
    pub character_size: (f32, f32),
    /// added to the player's position
    pub offset: (f32, f32, f32),
    /// world units, width x height of the cutout
    pub scale: (f32, f32),
}

impl Default for BillboardConfig {
    fn default() -> Self {
        BillboardConfig {
            texture_size: 1024,
            character_size: (600.0, 800.0),
            offset: (0.0, 0.2, 1.0),
            scale: (2.5, 3.0),
        }
    }
}

/// Where billboard pixels go
/// - the browser paints into an off-screen canvas
/// - tests record the calls instead
pub trait FrameSurface {
    fn clear(&mut self) -> Result<()>;
    fn fill(&mut self, rect: &Rect, color: &str) -> Result<()>;
    /// Copy `source` from the sprite sheet into `destination`,
    /// flipped horizontally around the destination's center when `mirrored`
    fn blit(&mut self, source: &Rect, destination: &Rect, mirrored: bool) -> Result<()>;
}

pub struct SpriteBillboard<S: FrameSurface> {
    surface: S,
    grid: SpriteSheetGrid,
    config: BillboardConfig,
    position: Point3,
    texture_dirty: bool,
}

impl<S: FrameSurface> SpriteBillboard<S> {
    pub fn new(surface: S, grid: SpriteSheetGrid, config: BillboardConfig) -> Self {
        SpriteBillboard {
            surface,
            grid,
            config,
            position: Point3::default(),
            texture_dirty: false,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn position(&self) -> Point3 {
        self.position
    }

    /// Paint sheet frame `frame` into the texture and flag it for upload
    pub fn render_frame(&mut self, frame: usize, facing: Facing) -> Result<()> {
        let source = self.grid.frame_rect(frame).ok_or_else(|| {
            SessionError::Tick(format!(
                "sprite frame {} is outside the {} frame sheet",
                frame, self.grid.frames
            ))
        })?;
        let texture = self.config.texture_size as f32;
        let (width, height) = self.config.character_size;
        let destination = Rect::new_from_x_y(
            (texture - width) / 2.0,
            (texture - height) / 2.0,
            width,
            height,
        );
        let halo = Rect::new_from_x_y(
            destination.x() - HALO_PADDING,
            destination.y() - HALO_PADDING,
            width + HALO_PADDING * 2.0,
            height + HALO_PADDING * 2.0,
        );

        self.surface.clear()?;
        self.surface.fill(&halo, HALO_COLOR)?;
        self.surface
            .blit(&source, &destination, facing == Facing::Left)?;
        self.texture_dirty = true;
        Ok(())
    }

    /// Follow the player, lifted and pulled toward the camera
    pub fn sync_position(&mut self, player: Point3) {
        let (x, y, z) = self.config.offset;
        self.position = player.offset(Point3::new(x, y, z));
    }

    /// True once per repaint, the renderer calls this before uploading
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.texture_dirty, false)
    }

    /// World space card the texture is stretched over
    pub fn world_bounds(&self) -> Aabb {
        let (width, height) = self.config.scale;
        Aabb::around(self.position.x, self.position.y, width / 2.0, height / 2.0)
    }
}

// ==================== Browser surface ====================
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
    sheet: Backdrop,
}

impl CanvasSurface {
    pub fn new(size: u32, sheet: Backdrop) -> Result<Self> {
        let canvas = browser::new_canvas(size, size)?;
        let context = browser::context(&canvas)?;
        Ok(CanvasSurface {
            canvas,
            context,
            sheet,
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn size(&self) -> Size {
        Size {
            width: self.canvas.width() as f32,
            height: self.canvas.height() as f32,
        }
    }
}

impl FrameSurface for CanvasSurface {
    fn clear(&mut self) -> Result<()> {
        self.context.clear_rect(
            0.0,
            0.0,
            self.canvas.width().into(),
            self.canvas.height().into(),
        );
        Ok(())
    }

    fn fill(&mut self, rect: &Rect, color: &str) -> Result<()> {
        self.context.set_fill_style_str(color);
        self.context.fill_rect(
            rect.x().into(),
            rect.y().into(),
            rect.size.width.into(),
            rect.size.height.into(),
        );
        Ok(())
    }

    fn blit(&mut self, source: &Rect, destination: &Rect, mirrored: bool) -> Result<()> {
        self.context.save();
        let drawn = if mirrored {
            self.mirror_around(destination)
                .and_then(|()| self.draw_frame(source, destination))
        } else {
            self.draw_frame(source, destination)
        };
        // transforms never leak past one blit, even on failure
        self.context.restore();
        drawn
    }
}

/// The copy the scene draws, refreshed only when the billboard repainted
pub struct BillboardTexture {
    canvas: HtmlCanvasElement,
    context: CanvasRenderingContext2d,
}

impl BillboardTexture {
    pub fn new(size: u32) -> Result<Self> {
        let canvas = browser::new_canvas(size, size)?;
        let context = browser::context(&canvas)?;
        Ok(BillboardTexture { canvas, context })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn upload(&self, source: &HtmlCanvasElement) -> Result<()> {
        let (width, height) = (self.canvas.width().into(), self.canvas.height().into());
        self.context.clear_rect(0.0, 0.0, width, height);
        self.context
            .draw_image_with_html_canvas_element_and_dw_and_dh(source, 0.0, 0.0, width, height)
            .map_err(|err| anyhow!("Could not upload billboard texture : {:#?}", err))
    }
}

impl CanvasSurface {
    /// Flip around the vertical axis through the destination's center
    fn mirror_around(&self, destination: &Rect) -> Result<()> {
        let axis = destination.x() + destination.size.width / 2.0;
        self.context
            .translate((axis * 2.0).into(), 0.0)
            .map_err(|err| anyhow!("Could not translate billboard : {:#?}", err))?;
        self.context
            .scale(-1.0, 1.0)
            .map_err(|err| anyhow!("Could not mirror billboard : {:#?}", err))
    }

    fn draw_frame(&self, source: &Rect, destination: &Rect) -> Result<()> {
        match &self.sheet {
            Backdrop::Image(image) => self
                .context
                .draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    image,
                    source.x().into(),
                    source.y().into(),
                    source.size.width.into(),
                    source.size.height.into(),
                    destination.x().into(),
                    destination.y().into(),
                    destination.size.width.into(),
                    destination.size.height.into(),
                ),
            Backdrop::Generated(canvas) => self
                .context
                .draw_image_with_html_canvas_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                    canvas,
                    source.x().into(),
                    source.y().into(),
                    source.size.width.into(),
                    source.size.height.into(),
                    destination.x().into(),
                    destination.y().into(),
                    destination.size.width.into(),
                    destination.size.height.into(),
                ),
        }
        .map_err(|err| anyhow!("Could not draw sprite frame : {:#?}", err))
    }
}
