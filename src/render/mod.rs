use std::collections::HashSet;
use image::RgbaImage;

use crate::{
    bitflags_with_display,
    utils::{Color, PixelRect, Size},
    world::{EntityStore, MapStore}
};

#[cfg(test)]
mod tests;

// ----------------------------------------------
// SpriteId
// ----------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpriteId(pub u32);

impl SpriteId {
    #[inline]
    pub const fn offset(self, index: u32) -> Self {
        SpriteId(self.0 + index)
    }
}

impl std::fmt::Display for SpriteId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// Well known sprite ids of the game's sprite archive.
pub mod sprites {
    use super::SpriteId;

    pub const MINIMAP_VIEW_RECT: SpriteId = SpriteId(354);
    pub const CURSOR:            SpriteId = SpriteId(201);
    pub const FLAG:              SpriteId = SpriteId(128);

    // First of 6 path segments, one per direction.
    pub const PATH_SEGMENT_BASE: SpriteId = SpriteId(220);
    pub const BORDER_DOT:        SpriteId = SpriteId(210);

    // First of 24 finished building sprites, indexed by building kind.
    pub const BUILDING_BASE:     SpriteId = SpriteId(400);
    // First of 24 construction frame sprites, indexed by building kind.
    pub const FRAME_BASE:        SpriteId = SpriteId(430);
    // First of BURNING_FRAME_COUNT fire animation frames.
    pub const BURNING_BASE:      SpriteId = SpriteId(460);
    pub const BURNING_FRAME_COUNT: u32 = 8;

    // First natural object sprite, indexed by map object value.
    pub const MAP_OBJECT_BASE:   SpriteId = SpriteId(300);

    pub const SERF:              SpriteId = SpriteId(500);
}

// ----------------------------------------------
// SpriteOptions
// ----------------------------------------------

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SpriteFlags: u8 {
        const Transparent = 1 << 0;
        const Centered    = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SpriteOptions {
    pub flags: SpriteFlags,
    pub tint: Option<Color>,
    // Fraction of the sprite shown, measured from its bottom edge. `None` draws all of it.
    pub reveal: Option<f32>,
    // Draw size relative to the sprite's own size. `None` is 1.
    pub scale: Option<f32>,
}

impl SpriteOptions {
    #[inline]
    pub fn transparent() -> Self {
        Self { flags: SpriteFlags::Transparent, ..Default::default() }
    }

    #[inline]
    #[must_use]
    pub fn with_flags(mut self, flags: SpriteFlags) -> Self {
        self.flags |= flags;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = Some(tint);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_reveal(mut self, fraction: f32) -> Self {
        self.reveal = Some(fraction.clamp(0.0, 1.0));
        self
    }

    #[inline]
    #[must_use]
    pub fn with_scale(mut self, factor: f32) -> Self {
        self.scale = Some(self.scale.unwrap_or(1.0) * factor);
        self
    }
}

// ----------------------------------------------
// DrawSurface
// ----------------------------------------------

// Low-level drawing target the compositors emit into.
// Coordinates are integer pixels relative to the surface origin.
pub trait DrawSurface {
    fn size(&self) -> Size;

    fn fill_rect(&mut self, rect: PixelRect, color: Color);
    fn draw_rect(&mut self, rect: PixelRect, color: Color);

    // Returns false if the sprite is not available. Nothing is drawn in that case.
    fn draw_sprite(&mut self, sprite: SpriteId, x: i32, y: i32, options: SpriteOptions) -> bool;

    fn draw_image(&mut self, image: &RgbaImage, x: i32, y: i32);
    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color);
}

// ----------------------------------------------
// DrawContext
// ----------------------------------------------

// Everything a compositor reads or writes during one draw.
pub struct DrawContext<'a> {
    pub surface: &'a mut dyn DrawSurface,
    pub map: &'a dyn MapStore,
    pub entities: &'a dyn EntityStore,
}

impl<'a> DrawContext<'a> {
    #[inline]
    pub fn new(surface: &'a mut dyn DrawSurface, map: &'a dyn MapStore, entities: &'a dyn EntityStore) -> Self {
        Self { surface, map, entities }
    }
}

// ----------------------------------------------
// DrawStats
// ----------------------------------------------

#[derive(Copy, Clone, Debug, Default)]
pub struct DrawStats {
    // Current frame totals:
    pub cells_plotted: u32,
    pub sprites_drawn: u32,
    pub sprites_missing: u32,
    pub tiles_drawn: u32,
    // Peaks for the whole run:
    pub peak_cells_plotted: u32,
    pub peak_sprites_drawn: u32,
    pub peak_sprites_missing: u32,
    pub peak_tiles_drawn: u32,
}

impl DrawStats {
    #[inline]
    pub fn begin_frame(&mut self) {
        self.cells_plotted = 0;
        self.sprites_drawn = 0;
        self.sprites_missing = 0;
        self.tiles_drawn = 0;
    }

    #[inline]
    pub fn end_frame(&mut self) {
        self.peak_cells_plotted   = self.peak_cells_plotted.max(self.cells_plotted);
        self.peak_sprites_drawn   = self.peak_sprites_drawn.max(self.sprites_drawn);
        self.peak_sprites_missing = self.peak_sprites_missing.max(self.sprites_missing);
        self.peak_tiles_drawn     = self.peak_tiles_drawn.max(self.tiles_drawn);
    }

    // Counts the outcome of a `draw_sprite` call.
    #[inline]
    pub fn sprite(&mut self, drawn: bool) {
        if drawn {
            self.sprites_drawn += 1;
        } else {
            self.sprites_missing += 1;
        }
    }
}

// ----------------------------------------------
// CommandRecorder
// ----------------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    FillRect  { rect: PixelRect, color: Color },
    DrawRect  { rect: PixelRect, color: Color },
    Sprite    { sprite: SpriteId, x: i32, y: i32, options: SpriteOptions },
    Image     { x: i32, y: i32, width: u32, height: u32 },
    Text      { x: i32, y: i32, text: String, color: Color },
}

// Headless drawing surface that records every command it receives.
pub struct CommandRecorder {
    size: Size,
    commands: Vec<DrawCommand>,
    // `None` means every sprite is available.
    available_sprites: Option<HashSet<SpriteId>>,
    missing_sprites: u32,
}

impl CommandRecorder {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            commands: Vec::new(),
            available_sprites: None,
            missing_sprites: 0,
        }
    }

    pub fn with_available_sprites<I>(size: Size, sprites: I) -> Self
        where I: IntoIterator<Item = SpriteId>
    {
        Self {
            available_sprites: Some(sprites.into_iter().collect()),
            ..Self::new(size)
        }
    }

    #[inline]
    pub fn set_size(&mut self, size: Size) {
        self.size = size;
    }

    #[inline]
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    #[inline]
    pub fn missing_sprites(&self) -> u32 {
        self.missing_sprites
    }

    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
        self.missing_sprites = 0;
    }

    pub fn sprite_count(&self, sprite: SpriteId) -> usize {
        self.commands.iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Sprite { sprite: s, .. } if *s == sprite))
            .count()
    }

    #[inline]
    pub fn is_sprite_available(&self, sprite: SpriteId) -> bool {
        self.available_sprites.as_ref().is_none_or(|set| set.contains(&sprite))
    }
}

impl DrawSurface for CommandRecorder {
    #[inline]
    fn size(&self) -> Size {
        self.size
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn draw_rect(&mut self, rect: PixelRect, color: Color) {
        self.commands.push(DrawCommand::DrawRect { rect, color });
    }

    fn draw_sprite(&mut self, sprite: SpriteId, x: i32, y: i32, options: SpriteOptions) -> bool {
        if !self.is_sprite_available(sprite) {
            self.missing_sprites += 1;
            return false;
        }
        self.commands.push(DrawCommand::Sprite { sprite, x, y, options });
        true
    }

    fn draw_image(&mut self, image: &RgbaImage, x: i32, y: i32) {
        self.commands.push(DrawCommand::Image { x, y, width: image.width(), height: image.height() });
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.commands.push(DrawCommand::Text { x, y, text: text.to_string(), color });
    }
}

// ----------------------------------------------
// ClippedSurface
// ----------------------------------------------

// Maps a widget's local coordinates into `region` of a parent surface.
// Rect fills and images are clipped to the region; sprites and text are
// only translated and left for the parent to clip.
pub struct ClippedSurface<'a> {
    parent: &'a mut dyn DrawSurface,
    region: PixelRect,
}

impl<'a> ClippedSurface<'a> {
    #[inline]
    pub fn new(parent: &'a mut dyn DrawSurface, region: PixelRect) -> Self {
        Self { parent, region }
    }

    #[inline]
    fn to_parent(&self, rect: PixelRect) -> PixelRect {
        rect.translated(self.region.x, self.region.y)
    }
}

impl DrawSurface for ClippedSurface<'_> {
    #[inline]
    fn size(&self) -> Size {
        self.region.size()
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        let clipped = self.to_parent(rect).intersection(&self.region);
        if clipped.is_valid() {
            self.parent.fill_rect(clipped, color);
        }
    }

    fn draw_rect(&mut self, rect: PixelRect, color: Color) {
        let rect = self.to_parent(rect);
        if rect.intersects(&self.region) {
            self.parent.draw_rect(rect, color);
        }
    }

    fn draw_sprite(&mut self, sprite: SpriteId, x: i32, y: i32, options: SpriteOptions) -> bool {
        self.parent.draw_sprite(sprite, x + self.region.x, y + self.region.y, options)
    }

    fn draw_image(&mut self, image: &RgbaImage, x: i32, y: i32) {
        let bounds = PixelRect::new(x, y, image.width() as i32, image.height() as i32);
        let visible = self.to_parent(bounds).intersection(&self.region);
        if !visible.is_valid() {
            return;
        }

        if visible == self.to_parent(bounds) {
            self.parent.draw_image(image, visible.x, visible.y);
        } else {
            let cropped = image::imageops::crop_imm(
                image,
                (visible.x - self.region.x - x) as u32,
                (visible.y - self.region.y - y) as u32,
                visible.width as u32,
                visible.height as u32,
            ).to_image();
            self.parent.draw_image(&cropped, visible.x, visible.y);
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        self.parent.draw_text(x + self.region.x, y + self.region.y, text, color);
    }
}

// ----------------------------------------------
// ScaledSurface
// ----------------------------------------------

// Presents a frame of `frame` pixels on a parent surface of `target` pixels.
// Rects grow outwards to whole target pixels so neighbouring fills and
// images leave no gaps.
pub struct ScaledSurface<'a> {
    parent: &'a mut dyn DrawSurface,
    frame: Size,
    scale_x: f32,
    scale_y: f32,
}

impl<'a> ScaledSurface<'a> {
    pub fn new(parent: &'a mut dyn DrawSurface, frame: Size, target: Size) -> Self {
        let frame = Size::new(frame.width.max(1), frame.height.max(1));
        Self {
            parent,
            frame,
            scale_x: target.width as f32 / frame.width as f32,
            scale_y: target.height as f32 / frame.height as f32,
        }
    }

    #[inline]
    fn to_parent_point(&self, x: i32, y: i32) -> (i32, i32) {
        ((x as f32 * self.scale_x).floor() as i32, (y as f32 * self.scale_y).floor() as i32)
    }

    fn to_parent(&self, rect: PixelRect) -> PixelRect {
        let (x, y) = self.to_parent_point(rect.x, rect.y);
        let max_x = (rect.max_x() as f32 * self.scale_x).ceil() as i32;
        let max_y = (rect.max_y() as f32 * self.scale_y).ceil() as i32;
        PixelRect::new(x, y, max_x - x, max_y - y)
    }
}

impl DrawSurface for ScaledSurface<'_> {
    #[inline]
    fn size(&self) -> Size {
        self.frame
    }

    fn fill_rect(&mut self, rect: PixelRect, color: Color) {
        let rect = self.to_parent(rect);
        if rect.is_valid() {
            self.parent.fill_rect(rect, color);
        }
    }

    fn draw_rect(&mut self, rect: PixelRect, color: Color) {
        let rect = self.to_parent(rect);
        if rect.is_valid() {
            self.parent.draw_rect(rect, color);
        }
    }

    fn draw_sprite(&mut self, sprite: SpriteId, x: i32, y: i32, options: SpriteOptions) -> bool {
        let (x, y) = self.to_parent_point(x, y);
        self.parent.draw_sprite(sprite, x, y, options.with_scale(self.scale_x))
    }

    fn draw_image(&mut self, image: &RgbaImage, x: i32, y: i32) {
        let bounds = self.to_parent(PixelRect::new(x, y, image.width() as i32, image.height() as i32));
        if !bounds.is_valid() {
            return;
        }

        if bounds.width as u32 == image.width() && bounds.height as u32 == image.height() {
            self.parent.draw_image(image, bounds.x, bounds.y);
        } else {
            let resized = image::imageops::resize(
                image,
                bounds.width as u32,
                bounds.height as u32,
                image::imageops::FilterType::Nearest,
            );
            self.parent.draw_image(&resized, bounds.x, bounds.y);
        }
    }

    fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color) {
        let (x, y) = self.to_parent_point(x, y);
        self.parent.draw_text(x, y, text, color);
    }
}
