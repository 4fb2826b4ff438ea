//! chemoprep-pixels — structure-image pixel features.
//!
//! Turns a rendered 2D structure PNG into a fixed-length pixel vector:
//! grayscale → background flattening → anti-aliased downsample → intensity
//! inversion → row-major flatten. The renderer draws on a single flat
//! background intensity; everything strictly below it is structure,
//! everything above it is compression noise and is left untouched.

use image::imageops::FilterType;
use serde::Serialize;
use tracing::{info, warn};

use chemoprep_common::config::ImageConfig;
use chemoprep_common::{ResolvedCompound, Result};
use chemoprep_pubchem::client::CompoundSource;

/// Pixel feature vector for one resolved compound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelRow {
    pub drug_id: String,
    pub cid: u32,
    /// Inverted intensities, row-major, exactly `ImageConfig::vector_len()`
    /// entries. Higher values mean more structure.
    pub pixels: Vec<u8>,
}

/// Why a compound's image features could not be computed.
#[derive(Debug, Clone, Serialize)]
pub struct PixelFailure {
    pub drug_id: String,
    pub cid: u32,
    pub reason: String,
}

/// Outcome of pixel extraction over a batch of compounds.
#[derive(Debug)]
pub struct PixelOutcome {
    /// One row per surviving compound, in input order.
    pub rows: Vec<PixelRow>,
    /// Input indices of the surviving compounds, ascending. Lets the
    /// caller drop the same compounds from the descriptor side.
    pub kept_indices: Vec<usize>,
    pub failures: Vec<PixelFailure>,
}

/// Decode a structure PNG and flatten it into the pixel feature vector.
pub fn pixels_from_png(png: &[u8], cfg: &ImageConfig) -> Result<Vec<u8>> {
    let mut gray = image::load_from_memory(png)?.to_luma8();

    for p in gray.pixels_mut() {
        let v = p.0[0];
        if v == cfg.background_intensity {
            p.0[0] = 255;
        } else if v < cfg.background_intensity {
            p.0[0] = 0;
        }
    }

    let small = if gray.dimensions() == (cfg.size, cfg.size) {
        gray
    } else {
        image::imageops::resize(&gray, cfg.size, cfg.size, FilterType::Lanczos3)
    };

    Ok(small.pixels().map(|p| 255 - p.0[0]).collect())
}

/// Fetch and flatten structure images for a batch of resolved compounds.
///
/// A failed fetch or decode drops that compound, the same policy the
/// resolver applies; the batch always runs to completion.
pub async fn extract_pixels<S>(
    source: &S,
    compounds: &[ResolvedCompound],
    cfg: &ImageConfig,
) -> PixelOutcome
where
    S: CompoundSource + ?Sized,
{
    let mut rows = Vec::with_capacity(compounds.len());
    let mut kept_indices = Vec::with_capacity(compounds.len());
    let mut failures = Vec::new();

    for (idx, compound) in compounds.iter().enumerate() {
        let result = match source.fetch_png(compound.cid).await {
            Ok(png) => pixels_from_png(&png, cfg),
            Err(e) => Err(e),
        };
        match result {
            Ok(pixels) => {
                rows.push(PixelRow {
                    drug_id: compound.drug_id.clone(),
                    cid: compound.cid,
                    pixels,
                });
                kept_indices.push(idx);
            }
            Err(e) => {
                warn!(
                    drug_id = %compound.drug_id,
                    cid = compound.cid,
                    error = %e,
                    "Compound dropped during pixel extraction"
                );
                failures.push(PixelFailure {
                    drug_id: compound.drug_id.clone(),
                    cid: compound.cid,
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        total = compounds.len(),
        kept = rows.len(),
        dropped = failures.len(),
        "Pixel extraction complete"
    );

    PixelOutcome {
        rows,
        kept_indices,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};

    fn encode_png(img: ImageBuffer<Luma<u8>, Vec<u8>>) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    /// Background 245 everywhere, a black square in the top-left corner,
    /// one near-white speck at (width − 10, 0).
    fn structure_png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            if x < width / 4 && y < height / 4 {
                Luma([0u8])
            } else if x == width - 10 && y == 0 {
                Luma([250u8])
            } else {
                Luma([245u8])
            }
        });
        encode_png(img)
    }

    #[test]
    fn test_exact_values_without_resampling() {
        // 60×60 input skips the resize, so the binarization is exact.
        let cfg = ImageConfig::default();
        let pixels = pixels_from_png(&structure_png(60, 60), &cfg).unwrap();
        assert_eq!(pixels.len(), 3600);

        // structure pixel: 0 → 0 → inverted 255
        assert_eq!(pixels[0], 255);
        // background: 245 → 255 → inverted 0
        assert_eq!(pixels[59], 0);
        // above-background speck at (50, 0): untouched, inverted to 5
        assert_eq!(pixels[50], 5);
    }

    #[test]
    fn test_downsampled_vector_has_fixed_length() {
        let cfg = ImageConfig::default();
        let pixels = pixels_from_png(&structure_png(300, 180), &cfg).unwrap();
        assert_eq!(pixels.len(), cfg.vector_len());

        // The black square must survive the resize as high-intensity
        // foreground and the background as (near-)zero.
        assert!(pixels[0] > 128);
        assert!(pixels[pixels.len() - 1] < 16);
    }

    #[test]
    fn test_configured_size_is_respected() {
        let cfg = ImageConfig {
            size: 24,
            ..ImageConfig::default()
        };
        let pixels = pixels_from_png(&structure_png(100, 100), &cfg).unwrap();
        assert_eq!(pixels.len(), 576);
    }

    #[test]
    fn test_garbage_bytes_are_an_error() {
        let cfg = ImageConfig::default();
        assert!(pixels_from_png(b"not a png", &cfg).is_err());
    }

    mod batch {
        use super::*;
        use async_trait::async_trait;
        use chemoprep_common::{ChemoprepError, Result};
        use chemoprep_pubchem::client::CompoundSource;

        struct MockSource;

        #[async_trait]
        impl CompoundSource for MockSource {
            async fn smiles_for_cid(&self, _cid: u32) -> Result<String> {
                unimplemented!("not used by pixel extraction")
            }

            async fn cids_for_name(&self, _name: &str) -> Result<Vec<u32>> {
                unimplemented!("not used by pixel extraction")
            }

            async fn fetch_png(&self, cid: u32) -> Result<Vec<u8>> {
                if cid == 666 {
                    return Err(ChemoprepError::Lookup(
                        "PNG fetch for CID 666 failed: HTTP 404".to_string(),
                    ));
                }
                Ok(structure_png(120, 120))
            }
        }

        fn compound(drug_id: &str, cid: u32) -> ResolvedCompound {
            ResolvedCompound {
                drug_id: drug_id.to_string(),
                cid,
                smiles: "C".to_string(),
            }
        }

        #[tokio::test]
        async fn test_failed_fetch_drops_only_that_compound() {
            let compounds = vec![
                compound("D1", 2244),
                compound("D2", 666),
                compound("D3", 5291),
            ];
            let outcome = extract_pixels(&MockSource, &compounds, &ImageConfig::default()).await;

            assert_eq!(outcome.rows.len(), 2);
            assert_eq!(outcome.kept_indices, vec![0, 2]);
            assert_eq!(outcome.failures.len(), 1);
            assert_eq!(outcome.failures[0].drug_id, "D2");
            assert!(outcome.rows.iter().all(|r| r.pixels.len() == 3600));
        }
    }
}
