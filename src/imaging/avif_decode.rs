//! AVIF source decoding.
//!
//! The `image` crate links only an AVIF *encoder* (rav1e); its decoder wants
//! the C library dav1d. Here `avif-parse` pulls the AV1 payload out of the
//! container and `rav1d`, the pure Rust port of dav1d, decodes it through its
//! dav1d-compatible API. The YUV planes are converted to RGB8 with BT.601
//! coefficients.

use super::backend::BackendError;
use image::{DynamicImage, Rgb, RgbImage};
use rav1d::include::dav1d::data::Dav1dData;
use rav1d::include::dav1d::dav1d::Dav1dSettings;
use rav1d::include::dav1d::headers::{
    DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
    DAV1D_PIXEL_LAYOUT_I444,
};
use rav1d::include::dav1d::picture::Dav1dPicture;
use rav1d::src::lib::{
    dav1d_close, dav1d_data_create, dav1d_data_unref, dav1d_default_settings, dav1d_get_picture,
    dav1d_open, dav1d_picture_unref, dav1d_send_data,
};
use std::io::Cursor;
use std::mem::MaybeUninit;
use std::path::Path;
use std::ptr::NonNull;

fn check(step: &str, code: i32) -> Result<(), BackendError> {
    if code == 0 {
        Ok(())
    } else {
        Err(BackendError::ProcessingFailed(format!(
            "rav1d {step} failed ({code})"
        )))
    }
}

/// Decode the primary item of an AVIF file.
pub(super) fn decode_avif(path: &Path) -> Result<DynamicImage, BackendError> {
    let file_data = std::fs::read(path)?;
    let avif = avif_parse::read_avif(&mut Cursor::new(&file_data)).map_err(|e| {
        BackendError::ProcessingFailed(format!("Failed to parse AVIF {}: {e:?}", path.display()))
    })?;
    let payload: &[u8] = &avif.primary_item;

    let mut settings = MaybeUninit::<Dav1dSettings>::uninit();
    // SAFETY: dav1d_default_settings writes every field.
    let mut settings = unsafe {
        dav1d_default_settings(NonNull::from(&mut settings).cast());
        settings.assume_init()
    };
    // A single still frame, decoded on the calling worker thread.
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    // SAFETY: both pointers outlive the call.
    let rc = unsafe { dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    check("open", rc.0)?;

    let decoded = (|| -> Result<RgbImage, BackendError> {
        let mut data = Dav1dData::default();
        // SAFETY: `data` is a valid, empty Dav1dData.
        let buf = unsafe { dav1d_data_create(NonNull::new(&mut data), payload.len()) };
        if buf.is_null() {
            return Err(BackendError::ProcessingFailed(
                "rav1d data_create failed".into(),
            ));
        }
        // SAFETY: `buf` was just allocated with room for `payload.len()` bytes.
        unsafe { std::ptr::copy_nonoverlapping(payload.as_ptr(), buf, payload.len()) };

        // SAFETY: `ctx` is open; on success the decoder takes ownership of `data`.
        let rc = unsafe { dav1d_send_data(ctx, NonNull::new(&mut data)) };
        if let Err(e) = check("send_data", rc.0) {
            // SAFETY: `data` was not consumed and is released once.
            unsafe { dav1d_data_unref(NonNull::new(&mut data)) };
            return Err(e);
        }

        // SAFETY: an all-zero picture is the empty state get_picture expects.
        let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
        // SAFETY: `ctx` is open and `pic` is empty.
        let rc = unsafe { dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
        check("get_picture", rc.0)?;
        let rgb = picture_to_rgb(&pic);
        // SAFETY: `pic` holds the reference from get_picture, released once.
        unsafe { dav1d_picture_unref(NonNull::new(&mut pic)) };
        rgb
    })();

    // SAFETY: `ctx` was opened above and is closed exactly once.
    unsafe { dav1d_close(NonNull::new(&mut ctx)) };
    decoded.map(DynamicImage::ImageRgb8)
}

/// One plane of a decoded picture.
struct Plane {
    ptr: *const u8,
    stride: isize,
}

impl Plane {
    fn new<T>(data: Option<NonNull<T>>, stride: isize) -> Result<Self, BackendError> {
        let ptr = data
            .ok_or_else(|| BackendError::ProcessingFailed("AVIF picture plane missing".into()))?;
        Ok(Self {
            ptr: ptr.cast::<u8>().as_ptr(),
            stride,
        })
    }

    /// Sample at `(x, y)`. Depths above 8 bits are stored as `u16`.
    ///
    /// # Safety
    ///
    /// `(x, y)` must lie inside the plane, and the picture that owns it must
    /// still be referenced.
    unsafe fn sample(&self, x: u32, y: u32, wide: bool) -> f32 {
        let row = unsafe { self.ptr.offset(y as isize * self.stride) };
        if wide {
            unsafe { row.cast::<u16>().add(x as usize).read_unaligned() as f32 }
        } else {
            unsafe { *row.add(x as usize) as f32 }
        }
    }
}

struct Chroma {
    u: Plane,
    v: Plane,
    /// Subsampling as a right shift: 1 halves that axis.
    shift_x: u32,
    shift_y: u32,
}

fn picture_to_rgb(pic: &Dav1dPicture) -> Result<RgbImage, BackendError> {
    let (width, height) = (pic.p.w as u32, pic.p.h as u32);
    let depth = pic.p.bpc as u32;
    let luma = Plane::new(pic.data[0], pic.stride[0])?;
    let chroma = match pic.p.layout {
        DAV1D_PIXEL_LAYOUT_I400 => None,
        layout => {
            let (shift_x, shift_y) = match layout {
                DAV1D_PIXEL_LAYOUT_I420 => (1, 1),
                DAV1D_PIXEL_LAYOUT_I422 => (1, 0),
                DAV1D_PIXEL_LAYOUT_I444 => (0, 0),
                other => {
                    return Err(BackendError::ProcessingFailed(format!(
                        "Unsupported AVIF pixel layout: {other}"
                    )));
                }
            };
            Some(Chroma {
                u: Plane::new(pic.data[1], pic.stride[1])?,
                v: Plane::new(pic.data[2], pic.stride[1])?,
                shift_x,
                shift_y,
            })
        }
    };

    let wide = depth > 8;
    let center = (1u32 << (depth - 1)) as f32;
    let scale = 255.0 / ((1u32 << depth) - 1) as f32;
    let to_u8 = |v: f32| (v * scale).clamp(0.0, 255.0) as u8;

    Ok(RgbImage::from_fn(width, height, |x, y| {
        // SAFETY: from_fn stays inside width x height, which every plane covers.
        let l = unsafe { luma.sample(x, y, wide) };
        let Some(c) = &chroma else {
            return Rgb([to_u8(l); 3]);
        };
        let (cx, cy) = (x >> c.shift_x, y >> c.shift_y);
        // SAFETY: chroma planes cover the subsampled picture size.
        let (cb, cr) = unsafe {
            (
                c.u.sample(cx, cy, wide) - center,
                c.v.sample(cx, cy, wide) - center,
            )
        };
        Rgb([
            to_u8(l + 1.402 * cr),
            to_u8(l - 0.344136 * cb - 0.714136 * cr),
            to_u8(l + 1.772 * cb),
        ])
    }))
}
