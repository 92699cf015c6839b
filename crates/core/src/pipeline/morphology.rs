//! Per-viewpoint morphological descriptors
//!
//! The building index is built once and shared read-only by every worker.
//! A viewpoint that fails (indoor viewpoint, degenerate isovist) yields an
//! error in its own slot; the other viewpoints are unaffected.

use crate::core_types::vec2::Vec2;
use crate::error::Result;
use crate::geometry::{
    elliptic_hull, isovist, panoptic_cast, star_kernel, Building, BuildingIndex, IsovistConfig,
    MabeConfig, RayCastConfig, RayStatistics, StarKernelConfig,
};
use geo::Polygon;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub isovist: IsovistConfig,
    pub rays: RayCastConfig,
    /// Rays of the panoptic cast behind the ray statistics
    pub panoptic_rays: usize,
    pub star_kernel: StarKernelConfig,
    pub mabe: MabeConfig,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            isovist: IsovistConfig::default(),
            rays: RayCastConfig::default(),
            panoptic_rays: 64,
            star_kernel: StarKernelConfig::default(),
            mabe: MabeConfig::default(),
        }
    }
}

/// Descriptors of one viewpoint, serialised under their column names
#[derive(Debug, Clone, Serialize)]
pub struct Descriptors {
    #[serde(skip)]
    pub viewpoint: Vec2,
    /// Isovist polygon
    #[serde(skip)]
    pub geometry: Polygon<f64>,
    #[serde(rename = "perim")]
    pub perimeter: f64,
    pub solid: f64,
    pub occlusiv: f64,
    pub skyline: f64,
    pub solid_surf: f64,
    pub occlu_surf: f64,
    pub skyline_r: f64,
    #[serde(rename = "anticipati")]
    pub anticipation: f64,
    #[serde(rename = "artif_hori")]
    pub artificial_horizon: usize,
    #[serde(rename = "isov_area")]
    pub isovist_area: f64,
    #[serde(rename = "isov_drift")]
    pub isovist_drift: f64,
    #[serde(rename = "MinLenRad")]
    pub min_ray_length: f64,
    #[serde(rename = "MaxLenRad")]
    pub max_ray_length: f64,
    #[serde(rename = "MeanLenRad")]
    pub mean_ray_length: f64,
    #[serde(rename = "mean_hw")]
    pub mean_height_width: f64,
    pub sky_view: f64,
    pub kern_drift: f64,
    pub kern_area: f64,
    pub kern_radius: f64,
    pub mabe_a: f64,
    pub mabe_b: f64,
    /// Major axis azimuth in degrees
    pub mabe_azim: f64,
    pub mabe_area: f64,
    pub mabe_meth: &'static str,
}

impl Descriptors {
    /// Numeric descriptors keyed by column name
    pub fn to_row(&self) -> BTreeMap<&'static str, f64> {
        BTreeMap::from([
            ("perim", self.perimeter),
            ("solid", self.solid),
            ("occlusiv", self.occlusiv),
            ("skyline", self.skyline),
            ("solid_surf", self.solid_surf),
            ("occlu_surf", self.occlu_surf),
            ("skyline_r", self.skyline_r),
            ("anticipati", self.anticipation),
            ("artif_hori", self.artificial_horizon as f64),
            ("isov_area", self.isovist_area),
            ("isov_drift", self.isovist_drift),
            ("MinLenRad", self.min_ray_length),
            ("MaxLenRad", self.max_ray_length),
            ("MeanLenRad", self.mean_ray_length),
            ("mean_hw", self.mean_height_width),
            ("sky_view", self.sky_view),
            ("kern_drift", self.kern_drift),
            ("kern_area", self.kern_area),
            ("kern_radius", self.kern_radius),
            ("mabe_a", self.mabe_a),
            ("mabe_b", self.mabe_b),
            ("mabe_azim", self.mabe_azim),
            ("mabe_area", self.mabe_area),
        ])
    }
}

/// Morphology pipeline over a fixed set of buildings
#[derive(Debug)]
pub struct MorphologyPipeline {
    index: BuildingIndex,
    config: MorphologyConfig,
}

impl MorphologyPipeline {
    pub fn new(buildings: Vec<Building>, config: MorphologyConfig) -> Self {
        Self {
            index: BuildingIndex::new(buildings),
            config,
        }
    }

    pub fn index(&self) -> &BuildingIndex {
        &self.index
    }

    pub fn config(&self) -> &MorphologyConfig {
        &self.config
    }

    /// Descriptors of a single viewpoint
    ///
    /// # Errors
    /// [`crate::Error::IndoorViewpoint`] for a viewpoint inside a building,
    /// or the first failure of the underlying geometric routines.
    pub fn describe(&self, viewpoint: Vec2) -> Result<Descriptors> {
        let iso = isovist(&self.index, viewpoint, &self.config.isovist)?;
        let rays = panoptic_cast(&self.index, viewpoint, self.config.panoptic_rays, &self.config.rays)?;
        let stats = RayStatistics::from_rays(&rays).unwrap_or(RayStatistics {
            min_length: 0.0,
            max_length: 0.0,
            mean_length: 0.0,
            mean_height_width: 0.0,
            sky_view: 1.0,
        });
        let kernel = star_kernel(&self.index, viewpoint, &self.config.star_kernel)?;
        let mabe = elliptic_hull(&iso.polygon, &self.config.mabe)?;

        let m = iso.metrics;
        Ok(Descriptors {
            viewpoint,
            perimeter: m.perimeter,
            solid: m.solid,
            occlusiv: m.occlusiv,
            skyline: m.skyline,
            solid_surf: m.solid_ratio,
            occlu_surf: m.occlusiv_ratio,
            skyline_r: m.skyline_ratio,
            anticipation: m.anticipation,
            artificial_horizon: m.artificial_horizon,
            isovist_area: m.area,
            isovist_drift: m.drift,
            min_ray_length: stats.min_length,
            max_ray_length: stats.max_length,
            mean_ray_length: stats.mean_length,
            mean_height_width: stats.mean_height_width,
            sky_view: stats.sky_view,
            kern_drift: kernel.drift,
            kern_area: kernel.area,
            kern_radius: kernel.radius,
            mabe_a: mabe.semi_major,
            mabe_b: mabe.semi_minor,
            mabe_azim: mabe.azimuth.to_degrees(),
            mabe_area: mabe.area,
            mabe_meth: mabe.method.as_str(),
            geometry: iso.polygon,
        })
    }

    /// Descriptors of every viewpoint, in input order
    pub fn run(&self, viewpoints: &[Vec2]) -> Vec<Result<Descriptors>> {
        info!(
            viewpoints = viewpoints.len(),
            buildings = self.index.len(),
            "Starting morphology pipeline"
        );
        let out: Vec<Result<Descriptors>> = viewpoints
            .par_iter()
            .map(|&vp| self.describe(vp))
            .collect();
        for (vp, result) in viewpoints.iter().zip(&out) {
            if let Err(err) = result {
                warn!(x = vp.x, y = vp.y, error = %err, "viewpoint skipped");
            }
        }
        info!(
            described = out.iter().filter(|r| r.is_ok()).count(),
            "Morphology pipeline finished"
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use approx::assert_abs_diff_eq;
    use geo::polygon;

    fn block(x0: f64, y0: f64, x1: f64, y1: f64, h: f64) -> Building {
        Building::new(
            polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1)],
            h,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_scene() {
        let pipeline = MorphologyPipeline::new(Vec::new(), MorphologyConfig::default());
        let d = pipeline.describe(Vec2::new(0.0, 0.0)).unwrap();
        assert_abs_diff_eq!(d.skyline_r, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d.min_ray_length, 100.0, epsilon = 1e-9);
        assert_abs_diff_eq!(d.mean_height_width, 0.0);
        assert_abs_diff_eq!(d.kern_radius, 100.0, epsilon = 1e-9);
        assert!(d.mabe_area >= d.isovist_area - 1e-6);
        assert!(d.mabe_a >= d.mabe_b);
        assert_eq!(d.to_row()["artif_hori"], 72.0);
    }

    #[test]
    fn test_indoor_viewpoint_does_not_abort_run() {
        let pipeline = MorphologyPipeline::new(
            vec![block(10.0, -5.0, 20.0, 5.0, 12.0)],
            MorphologyConfig::default(),
        );
        let out = pipeline.run(&[Vec2::new(0.0, 0.0), Vec2::new(15.0, 0.0)]);
        assert!(out[0].is_ok());
        assert!(matches!(out[1], Err(Error::IndoorViewpoint { .. })));

        let d = out[0].as_ref().unwrap();
        assert_abs_diff_eq!(d.min_ray_length, 10.0, epsilon = 1e-9);
        assert!(d.mean_height_width > 0.0);
        assert_abs_diff_eq!(
            d.solid_surf + d.occlu_surf + d.skyline_r,
            1.0,
            epsilon = 1e-6
        );
    }
}
