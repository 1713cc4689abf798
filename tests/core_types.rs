use imlocate::geometry::{Homography, Point};
use imlocate::{ChannelWeights, Image, ImageView, LocateError, Polarity, Quad, SimilarityField};

#[test]
fn image_view_rejects_invalid_dimensions() {
    let data = [0u8; 4];

    let err = ImageView::from_slice(&data, 0, 1).err().unwrap();
    assert_eq!(
        err,
        LocateError::InvalidDimensions {
            width: 0,
            height: 1,
        }
    );

    let err = ImageView::new(&data, 4, 1, 3).err().unwrap();
    assert_eq!(
        err,
        LocateError::InvalidStride {
            width: 4,
            stride: 3,
        }
    );

    let err = ImageView::new(&data[..3], 2, 2, 2).err().unwrap();
    assert_eq!(err, LocateError::BufferTooSmall { needed: 4, got: 3 });
}

#[test]
fn image_view_roi_matches_expected_values() {
    let data: Vec<u8> = (0u8..16).collect();
    let view = ImageView::from_slice(&data, 4, 4).unwrap();
    let roi = view.roi(1, 1, 2, 2).unwrap();
    assert_eq!(roi.stride(), 4);
    assert_eq!(roi.row(0).unwrap(), &[5u8, 6u8]);
    assert_eq!(roi.row(1).unwrap(), &[9u8, 10u8]);
    assert!(roi.get(2, 0).is_none());
    assert!(view.roi(3, 3, 2, 2).is_err());
}

#[test]
fn image_rejects_bad_channel_counts_and_lengths() {
    assert_eq!(
        Image::new(vec![0; 8], 2, 2, 2).unwrap_err(),
        LocateError::UnsupportedChannels { channels: 2 }
    );
    assert_eq!(
        Image::rgb(vec![0; 11], 2, 2).unwrap_err(),
        LocateError::BufferTooSmall { needed: 12, got: 11 }
    );
}

#[test]
fn rgb_image_converts_to_bt601_gray() {
    let img = Image::rgb(vec![255, 0, 0, 0, 255, 0, 0, 0, 255, 10, 10, 10], 2, 2).unwrap();
    let gray = img.to_gray();
    assert_eq!(gray.data(), &[76, 150, 29, 10]);
    let planes = img.to_rgb_planes();
    assert_eq!(planes[1].data(), &[0, 255, 0, 10]);
}

#[test]
fn crop_copies_the_region() {
    let img = Image::gray((0u8..20).collect(), 5, 4).unwrap();
    let crop = img.crop(1, 2, 3, 2).unwrap();
    assert_eq!(crop.as_raw(), &[11, 12, 13, 16, 17, 18]);
    assert!(img.crop(4, 0, 2, 1).is_err());
}

#[test]
fn channel_weights_are_validated() {
    assert_eq!(ChannelWeights::default().get(), [0.4, 0.3, 0.3]);
    assert!(matches!(
        ChannelWeights::new([0.2, 0.2, 0.2]),
        Err(LocateError::InvalidInput(_))
    ));
}

#[test]
fn field_flood_fill_then_best_moves_on() {
    #[rustfmt::skip]
    let data = vec![
        0.2, 0.3, 0.2, 0.1, 0.1,
        0.3, 0.9, 0.8, 0.1, 0.6,
        0.2, 0.8, 0.3, 0.1, 0.7,
    ];
    let mut field = SimilarityField::new(data, 5, 3, Polarity::HigherIsBetter).unwrap();
    let peak = field.best().unwrap();
    assert_eq!((peak.x, peak.y), (1, 1));
    field.flood_fill_suppress(peak.x, peak.y, 0.25, 1.0, -1000.0);
    assert_eq!(field.get(2, 1), Some(-1000.0));
    assert_eq!(field.get(0, 0), Some(0.2));
    let next = field.best().unwrap();
    assert_eq!((next.x, next.y), (4, 2));
}

#[test]
fn quad_follows_projective_corners() {
    let h = Homography::estimate(
        &[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)],
        &[(5.0, 5.0), (25.0, 5.0), (25.0, 25.0), (5.0, 25.0)],
    )
    .unwrap();
    let quad = Quad::from_homography(&h, 11, 11).unwrap();
    let (min, max) = quad.bounds();
    assert!((min.x - 5).abs() <= 1 && (min.y - 5).abs() <= 1);
    assert!((max.x - 25).abs() <= 1 && (max.y - 25).abs() <= 1);
    assert!((quad.top_left().x - 5).abs() <= 1);
    let bottom_left = quad.corners()[1];
    assert!((bottom_left.x - 5).abs() <= 1 && (bottom_left.y - 25).abs() <= 1);
    assert_ne!(bottom_left, Point::new(25, 5));
}
