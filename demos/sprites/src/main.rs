use flat_ngin::{DrawImageOptions, Duration, Filter, Game, Gpu, Image, Input, Rgba, Settings};

mod sprite;

use sprite::{Sprite, SpriteQuads};

const SCREEN_WIDTH: u32 = 256;
const SCREEN_HEIGHT: u32 = 240;
const SPRITE_COUNT: usize = 1000;

struct Sprites {
    source: image::DynamicImage,
    texture: Option<Image>,
    sprites: Vec<Sprite>,
}

impl Sprites {
    fn screen() -> (i32, i32) {
        (SCREEN_WIDTH as i32, SCREEN_HEIGHT as i32)
    }

    fn sprite_size(&self) -> (i32, i32) {
        (self.source.width() as i32, self.source.height() as i32)
    }
}

impl Game for Sprites {
    fn on_init(&mut self, gpu: &Gpu) -> anyhow::Result<()> {
        self.texture = Some(Image::from_image(gpu, &self.source, Filter::Nearest)?);
        let size = self.sprite_size();
        let mut rng = rand::rng();
        self.sprites = (0..SPRITE_COUNT)
            .map(|_| Sprite::new(&mut rng, Self::screen(), size))
            .collect();
        Ok(())
    }

    fn on_update(&mut self, _input: &Input, _dt: Duration) -> anyhow::Result<()> {
        let size = self.sprite_size();
        for sprite in &mut self.sprites {
            sprite.update(Self::screen(), size);
        }
        Ok(())
    }

    fn on_draw(&self, screen: &mut Image) -> anyhow::Result<()> {
        screen.fill(Rgba([128, 128, 255, 255]))?;
        let Some(texture) = &self.texture else {
            return Ok(());
        };
        let quads = SpriteQuads {
            sprites: &self.sprites,
            size: self.sprite_size(),
        };
        screen.draw_quads(texture, &quads, &DrawImageOptions::default())
    }
}

/// A 16x16 diamond used when `assets/ebiten.png` is not around.
fn placeholder() -> image::DynamicImage {
    let img = image::RgbaImage::from_fn(16, 16, |x, y| {
        let d = (x as i32 - 8).abs() + (y as i32 - 8).abs();
        if d < 8 {
            image::Rgba([255, 255 - (d as u8) * 24, 64, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    image::DynamicImage::ImageRgba8(img)
}

fn main() -> anyhow::Result<()> {
    let source = match futures::executor::block_on(flat_ngin::resources::load_image("ebiten.png")) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("{:#}; drawing a placeholder instead", e);
            placeholder()
        }
    };

    let game = Sprites {
        source,
        texture: None,
        sprites: Vec::new(),
    };
    flat_ngin::run(
        game,
        Settings::new(SCREEN_WIDTH, SCREEN_HEIGHT)
            .with_scale(2)
            .with_title("Sprites (flat-ngin)"),
    )
}
