use std::ops::{Add, Mul, Sub};
use serde::{Deserialize, Serialize};

pub mod hash;

// ----------------------------------------------
// Macros
// ----------------------------------------------

// Defines a bitflags struct with a Display implementation.
#[macro_export]
macro_rules! bitflags_with_display {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                const $flag:ident = $value:expr;
            )+
        }
    ) => {
        bitflags::bitflags! {
            $(#[$meta])*
            $vis struct $name: $ty {
                $(
                    const $flag = $value;
                )+
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                let mut first = true;
                $(
                    if self.contains($name::$flag) {
                        if !first {
                            write!(f, " | ")?;
                        }
                        write!(f, stringify!($flag))?;
                        first = false;
                    }
                )+
                if first {
                    write!(f, "(empty)")
                } else {
                    Ok(())
                }
            }
        }
    };
}

// ----------------------------------------------
// Color
// ----------------------------------------------

// 8-bit RGBA color. Matches the pixel layout of the cached tile images.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK:        Self = Self::rgb(0,   0,   0);
    pub const WHITE:        Self = Self::rgb(255, 255, 255);
    pub const TRANSPARENT:  Self = Self::new(0, 0, 0, 0);
    pub const LIGHT_GRAY:   Self = Self::rgb(115, 110, 105);
    pub const DARK_GRAY:    Self = Self::rgb(70,  65,  60);
    pub const LIGHT_BROWN:  Self = Self::rgb(110, 65,  35);
    pub const DARK_BROWN:   Self = Self::rgb(75,  35,  10);
    pub const LIGHT_YELLOW: Self = Self::rgb(210, 225, 20);
    pub const DARK_BLUE:    Self = Self::rgb(30,  100, 115);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    #[inline]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    // Scales the RGB channels by `factor`, saturating. Alpha is preserved.
    #[inline]
    #[must_use]
    pub fn shaded(self, factor: f32) -> Self {
        let scale = |c: u8| ((c as f32) * factor).round().clamp(0.0, 255.0) as u8;
        Self { r: scale(self.r), g: scale(self.g), b: scale(self.b), a: self.a }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{},{},{}]", self.r, self.g, self.b, self.a)
    }
}

// ----------------------------------------------
// Size
// ----------------------------------------------

// Integer width & height pair.
#[derive(Copy, Clone, Debug, Default, PartialOrd, Ord, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: i32,
    pub height: i32,
}

impl Size {
    #[inline]
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { width: 0, height: 0 }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    // Size scaled by a positive factor, rounded to the nearest pixel and never below 1x1.
    #[inline]
    #[must_use]
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            width:  (((self.width  as f32) * factor).round() as i32).max(1),
            height: (((self.height as f32) * factor).round() as i32).max(1),
        }
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[{},{}]", self.width, self.height)
    }
}

// ----------------------------------------------
// PixelRect
// ----------------------------------------------

// Integer screen-space rectangle. `x,y` is the top-left corner.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    #[inline]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn from_size(size: Size) -> Self {
        Self { x: 0, y: 0, width: size.width, height: size.height }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    #[inline]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    #[inline]
    pub fn max_x(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> i32 {
        self.y + self.height
    }

    // Inclusive of min, exclusive of max.
    #[inline]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.max_x() && y >= self.y && y < self.max_y()
    }

    #[inline]
    pub fn intersects(&self, other: &PixelRect) -> bool {
        self.x < other.max_x()
        && self.max_x() > other.x
        && self.y < other.max_y()
        && self.max_y() > other.y
    }

    // Overlapping area of both rects. Empty (zero sized) if they don't intersect.
    #[inline]
    #[must_use]
    pub fn intersection(&self, other: &PixelRect) -> Self {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        Self { x, y, width: (max_x - x).max(0), height: (max_y - y).max(0) }
    }

    #[inline]
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self { x: self.x + dx, y: self.y + dy, ..*self }
    }
}

impl std::fmt::Display for PixelRect {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "(P:[{},{}], S:[{},{}])", self.x, self.y, self.width, self.height)
    }
}

// ----------------------------------------------
// Conversion & math helpers
// ----------------------------------------------

// Linear interpolation.
#[inline]
pub fn lerp<T>(a: T, b: T, t: f32) -> T
    where T: Mul<f32, Output = T> + Add<Output = T> + Sub<Output = T> + Copy
{
    a + (b - a) * t
}

#[inline]
pub fn approx_equal(a: f32, b: f32, epsilon: f32) -> bool {
    (a - b).abs() < epsilon
}

#[inline]
pub fn is_power_of_two(value: u32) -> bool {
    value != 0 && (value & (value - 1)) == 0
}
