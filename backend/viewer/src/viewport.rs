use deepread_core::Rotation;

/// US Letter, used when a page declares no MediaBox.
pub const DEFAULT_PAGE_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Intrinsic page size in PDF points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

/// Pixel dimensions a page is rendered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Page size times scale, with sides swapped for quarter-turn rotations.
    pub fn for_page(page: PageSize, scale: f32, rotation: Rotation) -> Self {
        let width = (page.width * f64::from(scale)).round().max(1.0) as u32;
        let height = (page.height * f64::from(scale)).round().max(1.0) as u32;
        if rotation.is_sideways() {
            Self {
                width: height,
                height: width,
            }
        } else {
            Self { width, height }
        }
    }
}
