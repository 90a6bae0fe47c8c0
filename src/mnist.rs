use std::{
    fs::File,
    io::{self, BufReader, Read},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use machine_learning::dataset::Dataset;

const IMAGES_MAGIC: u32 = 0x0000_0803;
const LABELS_MAGIC: u32 = 0x0000_0801;

/// Side of the images as stored in the MNIST files.
pub const MNIST_SIDE: usize = 28;

/// One of the two MNIST partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Test,
}

impl Split {
    fn prefix(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "t10k",
        }
    }

    /// The (images, labels) files of this split under `root`.
    pub fn paths(self, root: &Path) -> (PathBuf, PathBuf) {
        let raw = root.join("MNIST").join("raw");
        let prefix = self.prefix();

        (
            raw.join(format!("{prefix}-images-idx3-ubyte")),
            raw.join(format!("{prefix}-labels-idx1-ubyte")),
        )
    }
}

/// The decoded content of an IDX image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdxImages {
    pub count: usize,
    pub rows: usize,
    pub cols: usize,
    pub pixels: Vec<u8>,
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn check_magic(magic: u32, expected: u32) -> io::Result<()> {
    if magic != expected {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid IDX magic number: 0x{magic:08x}, expected 0x{expected:08x}"),
        ));
    }

    Ok(())
}

/// Reads exactly `len` payload bytes, growing the buffer only as the data arrives.
fn read_payload<R: Read>(reader: R, len: usize) -> io::Result<Vec<u8>> {
    let mut payload = Vec::new();
    reader.take(len as u64).read_to_end(&mut payload)?;

    if payload.len() != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("IDX payload holds {} bytes, header declares {len}", payload.len()),
        ));
    }

    Ok(payload)
}

/// Reads an IDX image file (big-endian header, one byte per pixel).
pub fn read_images<R: Read>(mut reader: R) -> io::Result<IdxImages> {
    check_magic(read_u32(&mut reader)?, IMAGES_MAGIC)?;

    let count = read_u32(&mut reader)? as usize;
    let rows = read_u32(&mut reader)? as usize;
    let cols = read_u32(&mut reader)? as usize;

    let len = count
        .checked_mul(rows)
        .and_then(|len| len.checked_mul(cols))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("IDX dimensions {count}x{rows}x{cols} overflow"),
            )
        })?;
    let pixels = read_payload(&mut reader, len)?;

    Ok(IdxImages {
        count,
        rows,
        cols,
        pixels,
    })
}

/// Reads an IDX label file.
pub fn read_labels<R: Read>(mut reader: R) -> io::Result<Vec<u8>> {
    check_magic(read_u32(&mut reader)?, LABELS_MAGIC)?;

    let count = read_u32(&mut reader)? as usize;
    read_payload(reader, count)
}

/// Resizes a single channel image with bilinear interpolation.
///
/// Pixel centres sit at half-integer coordinates, so the corners of both images line up and
/// every output sample interpolates between its nearest source pixels, clamped at the edges.
pub fn resize_bilinear(src: &[f32], from: (usize, usize), to: (usize, usize)) -> Vec<f32> {
    let (h, w) = from;
    let (oh, ow) = to;

    if from == to {
        return src.to_vec();
    }

    let axis = |out: usize, len: usize, out_len: usize| {
        let pos = ((out as f32 + 0.5) * len as f32 / out_len as f32 - 0.5).max(0.);
        let i0 = (pos as usize).min(len - 1);
        let i1 = (i0 + 1).min(len - 1);
        (i0, i1, pos - i0 as f32)
    };

    let mut dst = Vec::with_capacity(oh * ow);

    for oy in 0..oh {
        let (y0, y1, ly) = axis(oy, h, oh);

        for ox in 0..ow {
            let (x0, x1, lx) = axis(ox, w, ow);

            let top = src[y0 * w + x0] * (1. - lx) + src[y0 * w + x1] * lx;
            let bottom = src[y1 * w + x0] * (1. - lx) + src[y1 * w + x1] * lx;
            dst.push(top * (1. - ly) + bottom * ly);
        }
    }

    dst
}

/// Loads a split of MNIST from the raw IDX files under `root`.
///
/// Pixels are scaled to `[0, 1]` and every image is resized to `side` x `side`.
pub fn load(root: &Path, split: Split, side: usize) -> Result<Dataset> {
    let (images_path, labels_path) = split.paths(root);

    let images = File::open(&images_path)
        .map(BufReader::new)
        .and_then(read_images)
        .with_context(|| format!("failed to read MNIST images at {}", images_path.display()))?;

    let labels = File::open(&labels_path)
        .map(BufReader::new)
        .and_then(read_labels)
        .with_context(|| format!("failed to read MNIST labels at {}", labels_path.display()))?;

    ensure!(
        images.count == labels.len(),
        "{} holds {} images but {} holds {} labels",
        images_path.display(),
        images.count,
        labels_path.display(),
        labels.len()
    );

    ensure!(
        images.rows > 0 && images.cols > 0,
        "{} holds empty images",
        images_path.display()
    );

    let from = (images.rows, images.cols);
    let mut pixels = Vec::with_capacity(images.count * side * side);

    for image in images.pixels.chunks_exact(images.rows * images.cols) {
        let scaled: Vec<f32> = image.iter().map(|&p| f32::from(p) / 255.).collect();
        pixels.extend(resize_bilinear(&scaled, from, (side, side)));
    }

    let labels = labels.into_iter().map(usize::from).collect();
    Ok(Dataset::new(pixels, labels, (1, side, side))?)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use approx::assert_abs_diff_eq;

    use super::*;

    fn idx_images(count: u32, rows: u32, cols: u32, pixels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for word in [IMAGES_MAGIC, count, rows, cols] {
            bytes.extend(word.to_be_bytes());
        }
        bytes.extend(pixels);
        bytes
    }

    fn idx_labels(labels: &[u8]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for word in [LABELS_MAGIC, labels.len() as u32] {
            bytes.extend(word.to_be_bytes());
        }
        bytes.extend(labels);
        bytes
    }

    #[test]
    fn parses_idx_headers_and_payload() {
        let images = read_images(idx_images(2, 1, 2, &[0, 255, 7, 9]).as_slice()).unwrap();
        assert_eq!(images.count, 2);
        assert_eq!((images.rows, images.cols), (1, 2));
        assert_eq!(images.pixels, vec![0, 255, 7, 9]);

        let labels = read_labels(idx_labels(&[3, 1, 4]).as_slice()).unwrap();
        assert_eq!(labels, vec![3, 1, 4]);
    }

    #[test]
    fn rejects_wrong_magic_and_truncated_files() {
        let swapped = idx_labels(&[1]);
        assert!(read_images(swapped.as_slice()).is_err());

        let truncated = idx_images(2, 2, 2, &[0; 5]);
        assert!(read_images(truncated.as_slice()).is_err());
    }

    #[test]
    fn oversized_headers_are_rejected() {
        let mut overflowing = Vec::new();
        for word in [IMAGES_MAGIC, u32::MAX, u32::MAX, u32::MAX] {
            overflowing.extend(word.to_be_bytes());
        }
        let err = read_images(overflowing.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        let mut short = idx_labels(&[1, 2, 3]);
        short[4..8].copy_from_slice(&u32::MAX.to_be_bytes());
        let err = read_labels(short.as_slice()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let truncated = idx_images(u32::MAX, 2, 2, &[0; 8]);
        assert!(read_images(truncated.as_slice()).is_err());
    }

    #[test]
    fn resize_keeps_constant_images_constant() {
        let src = vec![0.25; 28 * 28];
        let dst = resize_bilinear(&src, (28, 28), (32, 32));

        assert_eq!(dst.len(), 32 * 32);
        assert!(dst.iter().all(|&p| (p - 0.25).abs() < 1e-6));
    }

    #[test]
    fn resize_interpolates_between_pixel_centres() {
        // 1x2 -> 1x4: output centres at 0.25, 0.75, 1.25, 1.75 in source pixel units.
        let dst = resize_bilinear(&[0., 1.], (1, 2), (1, 4));
        let expected = [0., 0.25, 0.75, 1.];

        for (got, want) in dst.iter().zip(expected) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
        }
    }

    #[test]
    fn loads_a_split_from_the_raw_layout() {
        let root = tempfile::tempdir().unwrap();
        let raw = root.path().join("MNIST").join("raw");
        fs::create_dir_all(&raw).unwrap();

        let pixels = [vec![255; 4], vec![0; 4]].concat();
        fs::write(raw.join("t10k-images-idx3-ubyte"), idx_images(2, 2, 2, &pixels)).unwrap();
        fs::write(raw.join("t10k-labels-idx1-ubyte"), idx_labels(&[7, 2])).unwrap();

        let dataset = load(root.path(), Split::Test, 4).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.sample_shape(), (1, 4, 4));
        assert_eq!(dataset.labels(), &[7, 2]);
        assert_abs_diff_eq!(dataset.images()[[0, 0, 3, 3]], 1.);
        assert_abs_diff_eq!(dataset.images()[[1, 0, 0, 0]], 0.);
    }

    #[test]
    fn missing_files_are_an_error() {
        let root = tempfile::tempdir().unwrap();
        assert!(load(root.path(), Split::Train, 32).is_err());
    }
}
