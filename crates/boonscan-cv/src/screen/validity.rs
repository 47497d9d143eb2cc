//! Second-stage screen validation: probe a few fixed UI regions and ask a
//! trained good/bad oracle about each. Determines whether an image that
//! passed the aspect gate actually looks like a victory screen.

use anyhow::Context;
use image::RgbImage;

use crate::Result;
use crate::geometry::Rect;
use crate::screen::metadata::ScreenMetadata;
use crate::utils::image::crop;

/// Verdict oracle for one probe region. The trained runtime behind it is
/// external; the core only consumes scores.
pub trait ValidityOracle {
    fn is_good(&self, region: &RgbImage) -> Result<bool>;
}

impl<F> ValidityOracle for F
where
    F: Fn(&RgbImage) -> bool,
{
    fn is_good(&self, region: &RgbImage) -> Result<bool> {
        Ok(self(region))
    }
}

type RegionFn = fn(&ScreenMetadata) -> Rect;

/// One named probe: a fixed region of the template plus its oracle.
pub struct ValidityModel {
    pub name: String,
    region: RegionFn,
    oracle: Box<dyn ValidityOracle + Send + Sync>,
}

impl ValidityModel {
    pub fn new(
        name: impl Into<String>,
        region: RegionFn,
        oracle: Box<dyn ValidityOracle + Send + Sync>,
    ) -> Self {
        Self {
            name: name.into(),
            region,
            oracle,
        }
    }

    /// The cast icon always present at a fixed spot on real screens.
    pub fn cast_check(oracle: Box<dyn ValidityOracle + Send + Sync>) -> Self {
        Self::new("CastCheck", ScreenMetadata::cast_check_rect, oracle)
    }

    /// The healthbar area.
    pub fn health_check(oracle: Box<dyn ValidityOracle + Send + Sync>) -> Self {
        Self::new("HealthCheck", ScreenMetadata::health_check_rect, oracle)
    }

    /// The "back" button under the victory stats panel.
    pub fn back_button_check(oracle: Box<dyn ValidityOracle + Send + Sync>) -> Self {
        Self::new("BackButtonCheck", ScreenMetadata::back_button_rect, oracle)
    }

    /// Extract this model's probe region; `None` when the rect falls outside
    /// the image.
    pub fn extract(&self, meta: &ScreenMetadata, screen: &RgbImage) -> Option<RgbImage> {
        crop(screen, (self.region)(meta))
    }
}

/// Ask every model about its probe region; the screen passes once
/// `minimum_score` models agree. If any region fails to extract there's no
/// need to run the oracles at all.
pub fn is_valid_screen(
    screen: &RgbImage,
    models: &[ValidityModel],
    minimum_score: usize,
) -> Result<bool> {
    let meta = ScreenMetadata::for_image(screen)?;

    let mut regions = Vec::with_capacity(models.len());
    for model in models {
        match model.extract(&meta, screen) {
            Some(region) => regions.push((model, region)),
            None => return Ok(false),
        }
    }

    let mut score = 0;
    for (model, region) in &regions {
        let good = model
            .oracle
            .is_good(region)
            .with_context(|| format!("validity model {} failed", model.name))?;

        if good {
            // report success as soon as possible
            score += 1;
            if score >= minimum_score {
                return Ok(true);
            }
        }
    }

    Ok(false)
}
