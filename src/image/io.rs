//! Loading images from disk via the `image` crate.
//!
//! Available when the `image-io` feature is enabled.

use crate::image::Image;
use crate::util::{LocateError, LocateResult};
use std::path::Path;

/// Loads and decodes an image, keeping colour when the file has it.
///
/// A path that does not exist yields `FileNotFound`; anything the decoder
/// rejects yields `ImageIo`.
pub fn load_image<P: AsRef<Path>>(path: P) -> LocateResult<Image> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LocateError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let img = image::open(path).map_err(|err| LocateError::ImageIo {
        reason: err.to_string(),
    })?;
    Image::from_dynamic(&img)
}

/// Loads an image and converts it to a single grayscale channel.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> LocateResult<Image> {
    let img = load_image(path)?;
    let gray = img.to_gray();
    Image::gray(gray.data().to_vec(), gray.width(), gray.height())
}

#[cfg(test)]
mod tests {
    use super::{load_gray_image, load_image};
    use crate::util::LocateError;
    use image::{Rgb, RgbImage};

    #[test]
    fn missing_file_is_reported() {
        let err = load_image("definitely/not/here.png").err().unwrap();
        assert!(matches!(err, LocateError::FileNotFound { .. }));
    }

    #[test]
    fn colour_file_loads_as_rgb_or_gray() {
        let path = std::env::temp_dir().join(format!("imlocate-io-{}.png", std::process::id()));
        let mut img = RgbImage::from_pixel(6, 4, Rgb([200, 40, 10]));
        img.put_pixel(1, 2, Rgb([0, 0, 255]));
        img.save(&path).unwrap();

        let colour = load_image(&path).unwrap();
        assert_eq!((colour.width(), colour.height(), colour.channels()), (6, 4, 3));
        assert_eq!(colour.pixel(1, 2).unwrap(), &[0, 0, 255]);

        let gray = load_gray_image(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!((gray.width(), gray.height(), gray.channels()), (6, 4, 1));
        assert_eq!(gray.pixel(1, 2).unwrap(), &[29]);
        assert_eq!(gray.pixel(0, 0).unwrap(), &[84]);
    }

    #[test]
    fn undecodable_file_is_an_io_error() {
        let path = std::env::temp_dir().join(format!("imlocate-bad-{}.png", std::process::id()));
        std::fs::write(&path, b"not a png").unwrap();
        let err = load_gray_image(&path).err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, Some(LocateError::ImageIo { .. })));
    }
}
