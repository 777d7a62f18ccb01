/*
 *  canvas.rs
 *
 *  SMeterS - every dB counts
 *	(c) 2024-26 SMeterS contributors
 *
 *	TODO:
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::{Rgb888, RgbColor};
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;

/// An owned RGB bitmap the meter paints into. The host blits it wherever the
/// placement machine mounted the widget; skipping a draw therefore leaves the
/// previous frame visible, which is exactly the NaN-sample behavior.
#[derive(Debug, Clone)]
pub struct WidgetCanvas {
    buf: Vec<Rgb888>,
    w: usize,
    h: usize,
}

impl WidgetCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self { buf: vec![Rgb888::BLACK; w * h], w, h }
    }

    pub fn width(&self) -> usize { self.w }
    pub fn height(&self) -> usize { self.h }

    /// Immutable raw access, row-major.
    pub fn as_slice(&self) -> &[Rgb888] { &self.buf }

    /// Clear to a color
    pub fn clear_color(&mut self, color: Rgb888) {
        self.buf.fill(color);
    }

    /// Copy of the current frame, for change detection and tests.
    pub fn snapshot(&self) -> Vec<Rgb888> {
        self.buf.clone()
    }

    /// Invert every pixel's RGB channels in place (255 - value). Used by the
    /// theme pass when the host text color is dark.
    pub fn invert_channels(&mut self) {
        for px in self.buf.iter_mut() {
            *px = Rgb888::new(255 - px.r(), 255 - px.g(), 255 - px.b());
        }
    }

    /// Map (x,y) to linear index; returns None if out of bounds
    #[inline]
    fn idx(&self, p: Point) -> Option<usize> {
        if p.x >= 0 && p.y >= 0 {
            let (x, y) = (p.x as usize, p.y as usize);
            if x < self.w && y < self.h {
                return Some(y * self.w + x);
            }
        }
        None
    }
}

impl OriginDimensions for WidgetCanvas {
    fn size(&self) -> Size {
        Size::new(self.w as u32, self.h as u32)
    }
}

impl DrawTarget for WidgetCanvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            if let Some(i) = self.idx(p) {
                self.buf[i] = c;
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.clear_color(color);
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        // fast path for the rectangular fills the primitives use
        let Size { width, height } = area.size;
        if width == 0 || height == 0 { return Ok(()); }
        let (x0, y0) = (area.top_left.x.max(0) as usize, area.top_left.y.max(0) as usize);
        let w = width as usize;
        let h = height as usize;

        let mut it = colors.into_iter();
        for row in 0..h {
            let base = (y0 + row) * self.w + x0;
            for col in 0..w {
                if let Some(c) = it.next() {
                    let i = base + col;
                    if i < self.buf.len() { self.buf[i] = c; }
                } else {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::PrimitiveStyle;

    #[test]
    fn test_invert_round_trips() {
        let mut canvas = WidgetCanvas::new(8, 2);
        canvas.clear_color(Rgb888::new(10, 200, 33));
        canvas.invert_channels();
        assert_eq!(canvas.as_slice()[0], Rgb888::new(245, 55, 222));
        canvas.invert_channels();
        assert_eq!(canvas.as_slice()[0], Rgb888::new(10, 200, 33));
    }

    #[test]
    fn test_out_of_bounds_draw_is_clipped() {
        let mut canvas = WidgetCanvas::new(4, 4);
        let before = canvas.snapshot();
        Rectangle::new(Point::new(10, 10), Size::new(3, 3))
            .into_styled(PrimitiveStyle::with_fill(Rgb888::WHITE))
            .draw(&mut canvas)
            .unwrap();
        assert_eq!(canvas.snapshot(), before);
    }
}
