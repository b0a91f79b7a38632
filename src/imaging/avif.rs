//! AVIF decoding via `avif-parse` (container) + `rav1d` (AV1 frame).
//!
//! The `image` crate's `"avif"` feature only ships the rav1e **encoder**;
//! decoding needs `"avif-native"`, which links the C library dav1d. AVIF
//! sources and AVIF candidates (decoded back for the diff overlay) go through
//! `rav1d`, the pure Rust port of dav1d, instead.

use super::backend::BackendError;
use image::DynamicImage;
use log::warn;
use std::borrow::Cow;

/// Major and compatible brands of a leading ISO-BMFF `ftyp` box.
fn ftyp_brands(bytes: &[u8]) -> Option<(&[u8], Vec<&[u8]>)> {
    if bytes.len() < 12 || &bytes[4..8] != b"ftyp" {
        return None;
    }
    let size = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let compatible = bytes
        .get(16..size.min(bytes.len()))
        .unwrap_or_default()
        .chunks_exact(4)
        .collect();
    Some((&bytes[8..12], compatible))
}

/// Sniff the `ftyp` box for an AVIF major or compatible brand.
pub(crate) fn is_avif(bytes: &[u8]) -> bool {
    ftyp_brands(bytes).is_some_and(|(major, compatible)| {
        matches!(major, b"avif" | b"avis") || compatible.contains(&&b"avif"[..])
    })
}

/// `avif-parse` only accepts an `avif` major brand. Files that carry it as
/// a compatible brand (major `mif1`, `miaf`) get the major brand rewritten.
fn with_avif_major_brand(bytes: &[u8]) -> Cow<'_, [u8]> {
    match ftyp_brands(bytes) {
        Some((major, compatible))
            if !matches!(major, b"avif" | b"avis") && compatible.contains(&&b"avif"[..]) =>
        {
            let mut owned = bytes.to_vec();
            owned[8..12].copy_from_slice(b"avif");
            Cow::Owned(owned)
        }
        _ => Cow::Borrowed(bytes),
    }
}

fn decode_error(what: impl std::fmt::Display) -> BackendError {
    BackendError::DecodeFailed(format!("AVIF: {what}"))
}

/// Decode the primary item of an AVIF file into an RGB surface.
///
/// `avif-parse` asserts on some malformed boxes in debug builds, so a panic
/// anywhere in the container parse or the AV1 decode is reported as a
/// decode failure of this one file.
pub(crate) fn decode_avif(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    let container = with_avif_major_brand(bytes);
    std::panic::catch_unwind(|| decode_primary_item(&container)).unwrap_or_else(|panic| {
        let reason = panic
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| panic.downcast_ref::<&str>().copied())
            .unwrap_or("decoder panicked");
        warn!("AVIF decoder panicked: {reason}");
        Err(decode_error(format_args!("malformed file ({reason})")))
    })
}

fn decode_primary_item(bytes: &[u8]) -> Result<DynamicImage, BackendError> {
    use rav1d::include::dav1d::data::Dav1dData;
    use rav1d::include::dav1d::dav1d::Dav1dSettings;
    use rav1d::include::dav1d::headers::{
        DAV1D_PIXEL_LAYOUT_I400, DAV1D_PIXEL_LAYOUT_I420, DAV1D_PIXEL_LAYOUT_I422,
        DAV1D_PIXEL_LAYOUT_I444,
    };
    use rav1d::include::dav1d::picture::Dav1dPicture;
    use rav1d::src::lib as dav1d;
    use std::ptr::NonNull;

    let avif = avif_parse::read_avif(&mut std::io::Cursor::new(bytes))
        .map_err(|e| decode_error(format_args!("container parse failed: {e:?}")))?;
    let frame: &[u8] = &avif.primary_item;

    let mut settings = std::mem::MaybeUninit::<Dav1dSettings>::uninit();
    let Some(settings_ptr) = NonNull::new(settings.as_mut_ptr()) else {
        return Err(decode_error("could not initialize decoder settings"));
    };
    unsafe { dav1d::dav1d_default_settings(settings_ptr) };
    let mut settings = unsafe { settings.assume_init() };
    settings.n_threads = 1;
    settings.max_frame_delay = 1;

    let mut ctx = None;
    let rc = unsafe { dav1d::dav1d_open(NonNull::new(&mut ctx), NonNull::new(&mut settings)) };
    if rc.0 != 0 {
        return Err(decode_error(format_args!("decoder open failed ({})", rc.0)));
    }

    let mut data = Dav1dData::default();
    let buf = unsafe { dav1d::dav1d_data_create(NonNull::new(&mut data), frame.len()) };
    if buf.is_null() {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(decode_error("could not allocate frame buffer"));
    }
    unsafe { std::ptr::copy_nonoverlapping(frame.as_ptr(), buf, frame.len()) };

    let rc = unsafe { dav1d::dav1d_send_data(ctx, NonNull::new(&mut data)) };
    if rc.0 != 0 {
        unsafe {
            dav1d::dav1d_data_unref(NonNull::new(&mut data));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(decode_error(format_args!("send_data failed ({})", rc.0)));
    }

    let mut pic: Dav1dPicture = unsafe { std::mem::zeroed() };
    let rc = unsafe { dav1d::dav1d_get_picture(ctx, NonNull::new(&mut pic)) };
    if rc.0 != 0 {
        unsafe { dav1d::dav1d_close(NonNull::new(&mut ctx)) };
        return Err(decode_error(format_args!("get_picture failed ({})", rc.0)));
    }

    let width = pic.p.w as u32;
    let height = pic.p.h as u32;
    let layout = pic.p.layout;
    let (Some(y_plane), u_plane, v_plane) = (pic.data[0], pic.data[1], pic.data[2]) else {
        unsafe {
            dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
            dav1d::dav1d_close(NonNull::new(&mut ctx));
        }
        return Err(decode_error("decoded picture has no luma plane"));
    };
    let y_ptr = y_plane.as_ptr() as *const u8;

    let subsampling = match layout {
        DAV1D_PIXEL_LAYOUT_I400 => Some(None),
        DAV1D_PIXEL_LAYOUT_I420 => Some(Some((true, true))),
        DAV1D_PIXEL_LAYOUT_I422 => Some(Some((true, false))),
        DAV1D_PIXEL_LAYOUT_I444 => Some(Some((false, false))),
        _ => None,
    };

    let planes = match (subsampling, u_plane, v_plane) {
        (Some(None), _, _) => Some(YuvPlanes {
            y_ptr,
            u_ptr: y_ptr,
            v_ptr: y_ptr,
            y_stride: pic.stride[0],
            uv_stride: 0,
            width,
            height,
            bpc: pic.p.bpc as u32,
            ss_x: false,
            ss_y: false,
            monochrome: true,
        }),
        (Some(Some((ss_x, ss_y))), Some(u), Some(v)) => Some(YuvPlanes {
            y_ptr,
            u_ptr: u.as_ptr() as *const u8,
            v_ptr: v.as_ptr() as *const u8,
            y_stride: pic.stride[0],
            uv_stride: pic.stride[1],
            width,
            height,
            bpc: pic.p.bpc as u32,
            ss_x,
            ss_y,
            monochrome: false,
        }),
        _ => None,
    };
    let rgb = planes.map(|p| p.to_rgb());

    unsafe {
        dav1d::dav1d_picture_unref(NonNull::new(&mut pic));
        dav1d::dav1d_close(NonNull::new(&mut ctx));
    }

    let rgb = rgb.ok_or_else(|| decode_error(format_args!("unsupported pixel layout {layout}")))?;
    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| decode_error("decoded plane size does not match frame dimensions"))
}

/// Decoded YUV plane pointers from rav1d, valid until the picture is unref'd.
struct YuvPlanes {
    y_ptr: *const u8,
    u_ptr: *const u8,
    v_ptr: *const u8,
    y_stride: isize,
    uv_stride: isize,
    width: u32,
    height: u32,
    bpc: u32,
    ss_x: bool,
    ss_y: bool,
    monochrome: bool,
}

impl YuvPlanes {
    /// Interleaved RGB8 using BT.601 coefficients.
    fn to_rgb(&self) -> Vec<u8> {
        let max_val = ((1u32 << self.bpc) - 1) as f32;
        let center = (1u32 << (self.bpc - 1)) as f32;
        let scale = 255.0 / max_val;

        let mut rgb = Vec::with_capacity((self.width * self.height * 3) as usize);
        for row in 0..self.height {
            for col in 0..self.width {
                let luma = sample(self.y_ptr, self.y_stride, col, row, self.bpc);
                let pixel = if self.monochrome {
                    let v = (luma * scale).clamp(0.0, 255.0);
                    [v, v, v]
                } else {
                    let cx = if self.ss_x { col / 2 } else { col };
                    let cy = if self.ss_y { row / 2 } else { row };
                    let cb = sample(self.u_ptr, self.uv_stride, cx, cy, self.bpc) - center;
                    let cr = sample(self.v_ptr, self.uv_stride, cx, cy, self.bpc) - center;
                    [
                        ((luma + 1.402 * cr) * scale).clamp(0.0, 255.0),
                        ((luma - 0.344136 * cb - 0.714136 * cr) * scale).clamp(0.0, 255.0),
                        ((luma + 1.772 * cb) * scale).clamp(0.0, 255.0),
                    ]
                };
                rgb.extend(pixel.map(|c| c as u8));
            }
        }
        rgb
    }
}

/// Read one plane sample; 10- and 12-bit planes are stored as u16.
#[inline]
fn sample(ptr: *const u8, stride: isize, x: u32, y: u32, bpc: u32) -> f32 {
    if bpc <= 8 {
        (unsafe { *ptr.offset(y as isize * stride + x as isize) }) as f32
    } else {
        let offset = y as isize * stride + x as isize * 2;
        (unsafe { (ptr.offset(offset) as *const u16).read_unaligned() }) as f32
    }
}
