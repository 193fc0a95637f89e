//! Grayscale plate images paired with a plaque mask.

use crate::config::{FixedThresholdConfig, MeasurementConfig};
use crate::error::{Error, Result};
use crate::image::{ensure_non_empty, ensure_same_size, fixed_threshold, BinaryMask, IntensityImage};
use crate::measure::PlaqueMeasurementEngine;
use crate::plaque::PlaqueRecord;

/// A named grayscale image and its plaque mask.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayPlaqueImage {
    name: String,
    image: IntensityImage,
    mask: BinaryMask,
}

impl GrayPlaqueImage {
    /// Pairs `image` with `mask`, or with a mask derived by fixed
    /// thresholding when no mask is given. A supplied mask wins.
    pub fn new(
        name: impl Into<String>,
        image: IntensityImage,
        mask: Option<BinaryMask>,
        threshold: Option<FixedThresholdConfig>,
    ) -> Result<Self> {
        ensure_non_empty("image", &image)?;

        let mask = match (mask, threshold) {
            (Some(mask), _) => {
                ensure_same_size(&image, &mask)?;
                mask
            }
            (None, Some(config)) => {
                config.validate()?;
                fixed_threshold(&image, config.threshold, config.sigma)?
            }
            (None, None) => return Err(Error::MissingMask),
        };

        Ok(Self {
            name: name.into(),
            image,
            mask,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn image(&self) -> &IntensityImage {
        &self.image
    }

    pub fn mask(&self) -> &BinaryMask {
        &self.mask
    }

    pub fn get_plaques(&self, config: MeasurementConfig) -> Result<Vec<PlaqueRecord>> {
        let plaques = PlaqueMeasurementEngine::new(config)?.get_plaques(&self.mask)?;
        tracing::info!("{}: {} plaques", self.name, plaques.len());
        Ok(plaques)
    }
}

#[cfg(test)]
mod tests {
    use common::Buffer2;

    use super::*;
    use crate::convolution::{gaussian_filter, DEFAULT_TRUNCATE};
    use crate::image::threshold;
    use crate::test_utils::{disk_mask, gaussian_blobs};

    fn plate() -> IntensityImage {
        gaussian_blobs(60, 50, &[(15.0, 15.0, 1.0, 6.0), (42.0, 30.0, 1.0, 6.0)])
    }

    #[test]
    fn threshold_mask_matches_smoothed_image() {
        let image = plate();
        let config = FixedThresholdConfig {
            threshold: 0.5,
            sigma: 2.0,
        };
        let gray = GrayPlaqueImage::new("A01", image.clone(), None, Some(config)).unwrap();
        let expected = threshold(&gaussian_filter(&image, 2.0, DEFAULT_TRUNCATE).unwrap(), 0.5);
        assert_eq!(gray.mask(), &expected);
        assert_eq!(gray.name(), "A01");
    }

    #[test]
    fn supplied_mask_is_kept() {
        let image = plate();
        let mask = disk_mask(60, 50, 30.0, 25.0, 5.0);
        let gray = GrayPlaqueImage::new(
            "A02",
            image,
            Some(mask.clone()),
            Some(FixedThresholdConfig::new(0.5)),
        )
        .unwrap();
        assert_eq!(gray.mask(), &mask);

        let plaques = gray.get_plaques(MeasurementConfig::new(10, 200, false)).unwrap();
        assert_eq!(plaques.len(), 1);
        assert_eq!(plaques[0].area(), 81.0);
    }

    #[test]
    fn missing_mask_and_threshold_is_an_error() {
        assert!(matches!(
            GrayPlaqueImage::new("A03", plate(), None, None),
            Err(Error::MissingMask)
        ));
    }

    #[test]
    fn mismatched_mask_is_an_error() {
        let mask = Buffer2::new_filled(10, 10, false);
        assert!(matches!(
            GrayPlaqueImage::new("A04", plate(), Some(mask), None),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn thresholded_blobs_become_plaques() {
        let config = FixedThresholdConfig {
            threshold: 0.5,
            sigma: 1.0,
        };
        let gray = GrayPlaqueImage::new("B01", plate(), None, Some(config)).unwrap();
        let plaques = gray.get_plaques(MeasurementConfig::new(50, 1000, false)).unwrap();
        assert_eq!(plaques.len(), 2);
    }
}
