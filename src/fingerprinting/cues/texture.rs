use std::f64::consts::PI;

use image::{ImageBuffer, Luma};
use imageproc::filter::Kernel;
use ndarray::prelude::*;
use vid_fingerprint_common::CanonicalFrame;

use super::{grid_cell_means, Cue, CueKind, FeatureVector};
use crate::definitions::{GABOR_ASPECT_RATIO, GABOR_ORIENTATIONS, GABOR_WAVELENGTHS};

const QUADRANTS: usize = 4;

/// Responses of a bank of real, zero-mean Gabor filters.
///
/// Output order is wavelength-major, then orientation, then quadrant of the frame
/// (row-major). Each value is the mean absolute filter response over that quadrant.
#[derive(Debug, Clone)]
pub struct TextureCue {
    //(wavelength, orientation) pairs in output order.
    kernels: Vec<Array2<f64>>,
}

impl Default for TextureCue {
    fn default() -> Self {
        Self::new(&GABOR_WAVELENGTHS, GABOR_ORIENTATIONS)
    }
}

impl TextureCue {
    pub fn new(wavelengths: &[f64], orientations: usize) -> Self {
        let kernels = wavelengths
            .iter()
            .flat_map(|wavelength| {
                (0..orientations).map(move |k| {
                    let theta = k as f64 * PI / orientations as f64;
                    gabor_kernel(*wavelength, theta, GABOR_ASPECT_RATIO)
                })
            })
            .collect();

        Self { kernels }
    }
}

impl Cue for TextureCue {
    fn kind(&self) -> CueKind {
        CueKind::Texture
    }

    fn len(&self) -> usize {
        self.kernels.len() * QUADRANTS
    }

    fn compute(&self, frame: &CanonicalFrame) -> FeatureVector {
        let luma = frame.luma();

        self.kernels
            .iter()
            .flat_map(|kernel| {
                let response = abs_response(luma, kernel);
                grid_cell_means(response.width(), response.height(), 2, |x, y| {
                    response.get_pixel(x, y).0[0]
                })
            })
            .collect()
    }
}

//sigma is tied to the wavelength (one octave bandwidth), and the kernel is cut off at 2 sigma.
fn gabor_kernel(wavelength: f64, theta: f64, aspect: f64) -> Array2<f64> {
    let sigma = wavelength / 2.0;
    let radius = (2.0 * sigma).ceil() as isize;
    let size = (2 * radius + 1) as usize;
    let (sin_t, cos_t) = theta.sin_cos();

    let mut kernel = Array2::from_shape_fn((size, size), |(row, col)| {
        let y = row as isize - radius;
        let x = col as isize - radius;
        let (x, y) = (x as f64, y as f64);

        let x_rot = x * cos_t + y * sin_t;
        let y_rot = -x * sin_t + y * cos_t;

        let envelope = (-(x_rot * x_rot + aspect * aspect * y_rot * y_rot) / (2.0 * sigma * sigma)).exp();
        envelope * (2.0 * PI * x_rot / wavelength).cos()
    });

    //remove the DC component so that flat regions give no response.
    let mean = kernel.iter().sum::<f64>() / kernel.len() as f64;
    kernel.mapv_inplace(|v| v - mean);
    kernel
}

//absolute filter response at each pixel, with luma scaled to [0, 1]. imageproc pads by
//continuity, so pixels outside the frame take the value of the nearest edge pixel.
fn abs_response(luma: &image::GrayImage, kernel: &Array2<f64>) -> ImageBuffer<Luma<f64>, Vec<f64>> {
    let (k_height, k_width) = kernel.dim();
    let data: Vec<f64> = kernel.iter().copied().collect();

    Kernel::new(&data, k_width as u32, k_height as u32)
        .filter::<_, _, Luma<f64>>(luma, |channel, acc| *channel = (acc / 255.0).abs())
}
