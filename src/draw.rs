use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{PrimitiveStyleBuilder, Rectangle},
    text::{Baseline, Text},
};

use embedded_text::{
    alignment::{HorizontalAlignment, VerticalAlignment},
    style::TextBoxStyleBuilder,
    TextBox,
};

/// Fill a horizontal bar `height` rows tall starting at the top of the
/// canvas, the shape every meter line here reduces to. Zero or negative
/// spans draw nothing.
pub fn fill_hbar<D>(
    target: &mut D,
    x0: i32,
    x1: i32,
    height: u32,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888> + OriginDimensions,
{
    if x1 <= x0 {
        return Ok(());
    }
    Rectangle::new(Point::new(x0, 0), Size::new((x1 - x0) as u32, height))
        .into_styled(PrimitiveStyleBuilder::new().fill_color(color).build())
        .draw(target)?;
    Ok(())
}

/// A short vertical tick mark centered on `x`.
pub fn draw_tick<D>(
    target: &mut D,
    x: i32,
    y0: i32,
    y1: i32,
    width: u32,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888> + OriginDimensions,
{
    let half = (width / 2) as i32;
    Rectangle::new(Point::new(x - half, y0), Size::new(width, (y1 - y0) as u32))
        .into_styled(PrimitiveStyleBuilder::new().fill_color(color).build())
        .draw(target)?;
    Ok(())
}

/// A full-height vertical marker line centered on `x`.
pub fn draw_marker_line<D>(
    target: &mut D,
    x: i32,
    width: u32,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888> + OriginDimensions,
{
    let half = (width / 2) as i32;
    let height = target.size().height;
    Rectangle::new(Point::new(x - half, 0), Size::new(width, height))
        .into_styled(PrimitiveStyleBuilder::new().fill_color(color).build())
        .draw(target)?;
    Ok(())
}

pub fn draw_text<D>(
    target: &mut D,
    text: &str,
    x: i32,
    y: i32,
    font: &MonoFont,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888> + OriginDimensions,
{
    Text::with_baseline(text, Point::new(x, y), MonoTextStyle::new(font, color), Baseline::Top)
        .draw(target)
        .map(|_| ())
}

/// A label centered on `center_x`, bottom-aligned within a box reaching
/// the canvas bottom edge.
pub fn draw_label_centered<D>(
    target: &mut D,
    text: &str,
    center_x: i32,
    box_width: u32,
    font: &MonoFont,
    color: Rgb888,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888> + OriginDimensions,
{
    let h = font.character_size.height;
    let top_left = Point::new(
        center_x - (box_width / 2) as i32,
        target.size().height as i32 - h as i32,
    );
    let character_style = MonoTextStyle::new(font, color);
    let textbox_style = TextBoxStyleBuilder::new()
        .alignment(HorizontalAlignment::Center)
        .vertical_alignment(VerticalAlignment::Bottom)
        .build();
    let label_rect = Rectangle::new(top_left, Size::new(box_width, h));
    let label_box = TextBox::with_textbox_style(text, label_rect, character_style, textbox_style);
    label_box.draw(target)?;
    Ok(())
}
