//! Draw batches and their conversion into vertex data.
//!
//! A batch is anything implementing [`TextureQuads`], [`Lines`] or [`Rects`].
//! Slices of the concrete element types ([`ImagePart`], [`Line`],
//! [`FilledRect`]) implement them, and callers with their own storage (a
//! sprite list, a tile map) can implement the traits directly to avoid
//! building intermediate vectors.

use image::Rgba;

use crate::pipelines::{shape::ColoredVertex, texture::TexturedVertex};

/// Integer rectangle in pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// `(x0, y0, x1, y1)` corner form.
    pub const fn corners(&self) -> (i32, i32, i32, i32) {
        (self.x, self.y, self.x + self.width, self.y + self.height)
    }
}

/// Copy the `src` region of a source image into the `dst` region of the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImagePart {
    pub dst: Rect,
    pub src: Rect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub color: Rgba<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilledRect {
    pub rect: Rect,
    pub color: Rgba<u8>,
}

pub trait TextureQuads {
    fn len(&self) -> usize;
    /// Destination corners `(x0, y0, x1, y1)` in target pixels.
    fn vertex(&self, i: usize) -> (i32, i32, i32, i32);
    /// Source corners `(u0, v0, u1, v1)` in source texels.
    fn texture(&self, i: usize) -> (i32, i32, i32, i32);

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Lines {
    fn len(&self) -> usize;
    fn points(&self, i: usize) -> (i32, i32, i32, i32);
    fn color(&self, i: usize) -> Rgba<u8>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub trait Rects {
    fn len(&self) -> usize;
    /// `(x, y, width, height)`.
    fn rect(&self, i: usize) -> (i32, i32, i32, i32);
    fn color(&self, i: usize) -> Rgba<u8>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TextureQuads for [ImagePart] {
    fn len(&self) -> usize {
        <[ImagePart]>::len(self)
    }

    fn vertex(&self, i: usize) -> (i32, i32, i32, i32) {
        self[i].dst.corners()
    }

    fn texture(&self, i: usize) -> (i32, i32, i32, i32) {
        self[i].src.corners()
    }
}

impl Lines for [Line] {
    fn len(&self) -> usize {
        <[Line]>::len(self)
    }

    fn points(&self, i: usize) -> (i32, i32, i32, i32) {
        let l = &self[i];
        (l.x0, l.y0, l.x1, l.y1)
    }

    fn color(&self, i: usize) -> Rgba<u8> {
        self[i].color
    }
}

impl Rects for [FilledRect] {
    fn len(&self) -> usize {
        <[FilledRect]>::len(self)
    }

    fn rect(&self, i: usize) -> (i32, i32, i32, i32) {
        let r = &self[i].rect;
        (r.x, r.y, r.width, r.height)
    }

    fn color(&self, i: usize) -> Rgba<u8> {
        self[i].color
    }
}

pub(crate) fn normalize_color(color: Rgba<u8>) -> [f32; 4] {
    let [r, g, b, a] = color.0;
    [
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        f32::from(a) / 255.0,
    ]
}

/// Four vertices and six indices per quad.
///
/// Texel coordinates are divided by the power-of-two `storage` size of the
/// source texture, not its logical size.
pub(crate) fn texture_vertices<Q: TextureQuads + ?Sized>(
    quads: &Q,
    storage: (u32, u32),
) -> (Vec<TexturedVertex>, Vec<u32>) {
    let (tw, th) = (storage.0 as f32, storage.1 as f32);
    let mut vertices = Vec::with_capacity(quads.len() * 4);
    let mut indices = Vec::with_capacity(quads.len() * 6);
    for i in 0..quads.len() {
        let (x0, y0, x1, y1) = quads.vertex(i);
        let (u0, v0, u1, v1) = quads.texture(i);
        let (x0, y0, x1, y1) = (x0 as f32, y0 as f32, x1 as f32, y1 as f32);
        let (u0, v0, u1, v1) = (u0 as f32 / tw, v0 as f32 / th, u1 as f32 / tw, v1 as f32 / th);

        let base = vertices.len() as u32;
        vertices.extend_from_slice(&[
            TexturedVertex {
                position: [x0, y0],
                tex_coords: [u0, v0],
            },
            TexturedVertex {
                position: [x1, y0],
                tex_coords: [u1, v0],
            },
            TexturedVertex {
                position: [x0, y1],
                tex_coords: [u0, v1],
            },
            TexturedVertex {
                position: [x1, y1],
                tex_coords: [u1, v1],
            },
        ]);
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
    }
    (vertices, indices)
}

/// Two triangles per rectangle.
pub(crate) fn rect_vertices<R: Rects + ?Sized>(rects: &R) -> Vec<ColoredVertex> {
    let mut vertices = Vec::with_capacity(rects.len() * 6);
    for i in 0..rects.len() {
        let (x, y, w, h) = rects.rect(i);
        let color = normalize_color(rects.color(i));
        let (x0, y0, x1, y1) = (x as f32, y as f32, (x + w) as f32, (y + h) as f32);
        for position in [[x0, y0], [x1, y0], [x0, y1], [x1, y0], [x1, y1], [x0, y1]] {
            vertices.push(ColoredVertex { position, color });
        }
    }
    vertices
}

/// One segment per line, running through pixel centres.
pub(crate) fn line_vertices<L: Lines + ?Sized>(lines: &L) -> Vec<ColoredVertex> {
    let mut vertices = Vec::with_capacity(lines.len() * 2);
    for i in 0..lines.len() {
        let (x0, y0, x1, y1) = lines.points(i);
        let color = normalize_color(lines.color(i));
        vertices.push(ColoredVertex {
            position: [x0 as f32 + 0.5, y0 as f32 + 0.5],
            color,
        });
        vertices.push(ColoredVertex {
            position: [x1 as f32 + 0.5, y1 as f32 + 0.5],
            color,
        });
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_texels_are_normalized_by_storage_size() {
        let parts = [ImagePart {
            dst: Rect::new(10, 20, 16, 8),
            src: Rect::new(0, 0, 16, 8),
        }];
        let (vertices, indices) = texture_vertices(&parts[..], (32, 16));
        assert_eq!(vertices.len(), 4);
        assert_eq!(indices, vec![0, 1, 2, 1, 3, 2]);
        assert_eq!(vertices[0].position, [10.0, 20.0]);
        assert_eq!(vertices[3].position, [26.0, 28.0]);
        assert_eq!(vertices[0].tex_coords, [0.0, 0.0]);
        assert_eq!(vertices[3].tex_coords, [0.5, 0.5]);
    }

    #[test]
    fn quad_indices_advance_per_quad() {
        let part = ImagePart {
            dst: Rect::new(0, 0, 1, 1),
            src: Rect::new(0, 0, 1, 1),
        };
        let parts = vec![part; 3];
        let (vertices, indices) = texture_vertices(parts.as_slice(), (1, 1));
        assert_eq!(vertices.len(), 12);
        assert_eq!(&indices[12..], &[8, 9, 10, 9, 11, 10]);
    }

    #[test]
    fn rects_become_two_triangles() {
        let rects = [FilledRect {
            rect: Rect::new(1, 2, 3, 4),
            color: Rgba([255, 0, 51, 255]),
        }];
        let vertices = rect_vertices(&rects[..]);
        assert_eq!(vertices.len(), 6);
        assert_eq!(vertices[0].position, [1.0, 2.0]);
        assert_eq!(vertices[4].position, [4.0, 6.0]);
        assert_eq!(vertices[0].color, [1.0, 0.0, 0.2, 1.0]);
    }

    #[test]
    fn lines_hit_pixel_centres() {
        let lines = [Line {
            x0: 0,
            y0: 0,
            x1: 7,
            y1: 0,
            color: Rgba([0, 0, 0, 255]),
        }];
        let vertices = line_vertices(&lines[..]);
        assert_eq!(vertices.len(), 2);
        assert_eq!(vertices[0].position, [0.5, 0.5]);
        assert_eq!(vertices[1].position, [7.5, 0.5]);
    }

    #[test]
    fn empty_batches_produce_nothing() {
        let parts: [ImagePart; 0] = [];
        assert!(TextureQuads::is_empty(&parts[..]));
        let (vertices, indices) = texture_vertices(&parts[..], (2, 2));
        assert!(vertices.is_empty() && indices.is_empty());
    }
}
