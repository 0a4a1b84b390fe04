use flat_ngin::TextureQuads;
use rand::Rng;

/// A sprite bouncing off the screen edges at one pixel per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sprite {
    pub x: i32,
    pub y: i32,
    pub vx: i32,
    pub vy: i32,
}

impl Sprite {
    /// Random position fully on screen, random diagonal direction.
    pub fn new<R: Rng + ?Sized>(rng: &mut R, screen: (i32, i32), size: (i32, i32)) -> Self {
        let max_x = (screen.0 - size.0).max(1);
        let max_y = (screen.1 - size.1).max(1);
        Self {
            x: rng.random_range(0..max_x),
            y: rng.random_range(0..max_y),
            vx: if rng.random_bool(0.5) { 1 } else { -1 },
            vy: if rng.random_bool(0.5) { 1 } else { -1 },
        }
    }

    pub fn update(&mut self, screen: (i32, i32), size: (i32, i32)) {
        let max_x = screen.0 - size.0;
        let max_y = screen.1 - size.1;
        self.x += self.vx;
        self.y += self.vy;
        if self.x < 0 || max_x <= self.x {
            self.vx = -self.vx;
        }
        if self.y < 0 || max_y <= self.y {
            self.vy = -self.vy;
        }
    }
}

/// All sprites as one textured-quad batch sharing the whole texture.
pub struct SpriteQuads<'a> {
    pub sprites: &'a [Sprite],
    pub size: (i32, i32),
}

impl TextureQuads for SpriteQuads<'_> {
    fn len(&self) -> usize {
        self.sprites.len()
    }

    fn vertex(&self, i: usize) -> (i32, i32, i32, i32) {
        let s = &self.sprites[i];
        (s.x, s.y, s.x + self.size.0, s.y + self.size.1)
    }

    fn texture(&self, _i: usize) -> (i32, i32, i32, i32) {
        (0, 0, self.size.0, self.size.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    const SCREEN: (i32, i32) = (256, 240);
    const SIZE: (i32, i32) = (16, 16);

    #[test]
    fn new_sprites_start_on_screen() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let s = Sprite::new(&mut rng, SCREEN, SIZE);
            assert!((0..SCREEN.0 - SIZE.0).contains(&s.x));
            assert!((0..SCREEN.1 - SIZE.1).contains(&s.y));
            assert_eq!(s.vx.abs(), 1);
            assert_eq!(s.vy.abs(), 1);
        }
    }

    #[test]
    fn bounces_off_the_right_edge() {
        let mut s = Sprite {
            x: SCREEN.0 - SIZE.0 - 1,
            y: 10,
            vx: 1,
            vy: 1,
        };
        s.update(SCREEN, SIZE);
        assert_eq!(s.x, SCREEN.0 - SIZE.0);
        assert_eq!(s.vx, -1);
        s.update(SCREEN, SIZE);
        assert_eq!(s.x, SCREEN.0 - SIZE.0 - 1);
    }

    #[test]
    fn bounces_off_the_top_edge() {
        let mut s = Sprite {
            x: 10,
            y: 0,
            vx: -1,
            vy: -1,
        };
        s.update(SCREEN, SIZE);
        assert_eq!((s.x, s.y), (9, -1));
        assert_eq!(s.vy, 1);
        assert_eq!(s.vx, -1);
    }

    #[test]
    fn quads_cover_the_whole_texture() {
        let sprites = [Sprite {
            x: 3,
            y: 4,
            vx: 1,
            vy: 1,
        }];
        let quads = SpriteQuads {
            sprites: &sprites,
            size: SIZE,
        };
        assert_eq!(quads.len(), 1);
        assert_eq!(quads.vertex(0), (3, 4, 19, 20));
        assert_eq!(quads.texture(0), (0, 0, 16, 16));
    }
}
