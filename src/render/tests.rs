use image::{Rgba, RgbaImage};

use super::*;

#[test]
fn test_sprite_options() {
    let options = SpriteOptions::transparent()
        .with_flags(SpriteFlags::Centered)
        .with_reveal(1.5);

    assert_eq!(options.flags, SpriteFlags::Transparent | SpriteFlags::Centered);
    assert_eq!(options.reveal, Some(1.0));
    assert_eq!(options.tint, None);
    assert_eq!(sprites::FRAME_BASE.offset(3), SpriteId(433));
}

#[test]
fn test_recorder_sprite_availability() {
    let mut recorder = CommandRecorder::with_available_sprites(Size::new(10, 10), [sprites::CURSOR]);

    assert!(recorder.draw_sprite(sprites::CURSOR, 1, 2, SpriteOptions::default()));
    assert!(!recorder.draw_sprite(sprites::FLAG, 1, 2, SpriteOptions::default()));
    assert_eq!(recorder.sprite_count(sprites::CURSOR), 1);
    assert_eq!(recorder.sprite_count(sprites::FLAG), 0);
    assert_eq!(recorder.missing_sprites(), 1);

    recorder.clear();
    assert!(recorder.commands().is_empty());
    assert_eq!(recorder.missing_sprites(), 0);
}

#[test]
fn test_draw_stats_peaks() {
    let mut stats = DrawStats::default();

    stats.begin_frame();
    stats.sprite(true);
    stats.sprite(true);
    stats.sprite(false);
    stats.end_frame();

    stats.begin_frame();
    stats.sprite(true);
    stats.end_frame();

    assert_eq!(stats.sprites_drawn, 1);
    assert_eq!(stats.sprites_missing, 0);
    assert_eq!(stats.peak_sprites_drawn, 2);
    assert_eq!(stats.peak_sprites_missing, 1);
}

#[test]
fn test_clipped_surface_translates_and_clips() {
    let mut recorder = CommandRecorder::new(Size::new(100, 100));
    {
        let mut clipped = ClippedSurface::new(&mut recorder, PixelRect::new(10, 20, 30, 30));
        assert_eq!(clipped.size(), Size::new(30, 30));

        clipped.fill_rect(PixelRect::new(-5, -5, 10, 10), Color::WHITE);
        // Entirely outside; dropped.
        clipped.fill_rect(PixelRect::new(40, 0, 5, 5), Color::WHITE);
        clipped.draw_rect(PixelRect::new(100, 100, 5, 5), Color::WHITE);

        assert!(clipped.draw_sprite(sprites::CURSOR, 3, 4, SpriteOptions::default()));
        clipped.draw_text(0, 0, "hi", Color::BLACK);
    }

    assert_eq!(recorder.commands(), &[
        DrawCommand::FillRect { rect: PixelRect::new(10, 20, 5, 5), color: Color::WHITE },
        DrawCommand::Sprite { sprite: sprites::CURSOR, x: 13, y: 24, options: SpriteOptions::default() },
        DrawCommand::Text { x: 10, y: 20, text: "hi".to_string(), color: Color::BLACK },
    ]);
}

#[test]
fn test_clipped_surface_crops_images() {
    let mut image = RgbaImage::new(8, 8);
    image.put_pixel(6, 6, Rgba([1, 2, 3, 255]));

    let mut recorder = CommandRecorder::new(Size::new(64, 64));
    {
        let mut clipped = ClippedSurface::new(&mut recorder, PixelRect::new(0, 0, 10, 10));
        clipped.draw_image(&image, 1, 1);
        clipped.draw_image(&image, 5, 4);
        clipped.draw_image(&image, 20, 20);
    }

    assert_eq!(recorder.commands(), &[
        DrawCommand::Image { x: 1, y: 1, width: 8, height: 8 },
        DrawCommand::Image { x: 5, y: 4, width: 5, height: 6 },
    ]);
}

#[test]
fn test_scaled_surface() {
    let image = RgbaImage::new(8, 8);

    let mut recorder = CommandRecorder::new(Size::new(10, 10));
    {
        let mut scaled = ScaledSurface::new(&mut recorder, Size::new(20, 20), Size::new(10, 10));
        assert_eq!(scaled.size(), Size::new(20, 20));

        scaled.fill_rect(PixelRect::new(0, 0, 20, 20), Color::BLACK);
        // Half a pixel still covers a whole one.
        scaled.fill_rect(PixelRect::new(3, 3, 1, 1), Color::WHITE);
        scaled.draw_image(&image, 4, 4);
        assert!(scaled.draw_sprite(sprites::CURSOR, 7, 9, SpriteOptions::transparent()));
        scaled.draw_text(10, 10, "hi", Color::BLACK);
    }

    assert_eq!(recorder.commands(), &[
        DrawCommand::FillRect { rect: PixelRect::new(0, 0, 10, 10), color: Color::BLACK },
        DrawCommand::FillRect { rect: PixelRect::new(1, 1, 1, 1), color: Color::WHITE },
        DrawCommand::Image { x: 2, y: 2, width: 4, height: 4 },
        DrawCommand::Sprite { sprite: sprites::CURSOR, x: 3, y: 4, options: SpriteOptions::transparent().with_scale(0.5) },
        DrawCommand::Text { x: 5, y: 5, text: "hi".to_string(), color: Color::BLACK },
    ]);

    recorder.clear();
    {
        let mut scaled = ScaledSurface::new(&mut recorder, Size::new(10, 10), Size::new(20, 20));
        scaled.fill_rect(PixelRect::new(1, 1, 2, 2), Color::WHITE);
    }
    assert_eq!(recorder.commands(), &[
        DrawCommand::FillRect { rect: PixelRect::new(2, 2, 4, 4), color: Color::WHITE },
    ]);
}
