use image::RgbImage;

/// Per-channel tolerance used when comparing synthesized glyphs against the screen.
pub const TEXT_RECOGNITION_TOLERANCE: u8 = 4;

/// Tolerant comparison of one channel.
///
/// The difference is taken as a wrapping `u8` subtraction. Values at or above
/// `255 - tol` are the wrapped form of a small negative difference and count
/// as zero; anything else must be within `tol`. The window is asymmetric:
/// `a` may exceed `b` by up to `tol` or fall short by up to `tol + 1`. A
/// tolerance of zero is plain equality.
#[inline]
pub fn channel_matches(a: u8, b: u8, tol: u8) -> bool {
    if tol == 0 {
        return a == b;
    }
    let diff = a.wrapping_sub(b);
    diff >= 255 - tol || diff <= tol
}

/// Compare two equally shaped buffers under `tol`. Different shapes never match.
pub fn equal_with_tolerance(a: &RgbImage, b: &RgbImage, tol: u8) -> bool {
    if a.dimensions() != b.dimensions() {
        return false;
    }
    if tol == 0 {
        return a.as_raw() == b.as_raw();
    }
    a.as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .all(|(&x, &y)| channel_matches(x, y, tol))
}

/// Compare columns `[x0, x1)` over the full height of two same-sized buffers.
///
/// The column range is clamped to the image width.
pub fn columns_match(a: &RgbImage, b: &RgbImage, x0: u32, x1: u32, tol: u8) -> bool {
    debug_assert_eq!(a.dimensions(), b.dimensions());
    let (w, h) = a.dimensions();
    let x1 = x1.min(w);
    if x0 >= x1 {
        return true;
    }

    let stride = w as usize * 3;
    let (start, end) = (x0 as usize * 3, x1 as usize * 3);
    let (ra, rb) = (a.as_raw(), b.as_raw());

    (0..h as usize).all(|y| {
        let row = y * stride;
        let sa = &ra[row + start..row + end];
        let sb = &rb[row + start..row + end];
        if tol == 0 {
            sa == sb
        } else {
            sa.iter().zip(sb).all(|(&x, &y)| channel_matches(x, y, tol))
        }
    })
}
