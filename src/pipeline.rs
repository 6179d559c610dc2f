//! Batch rasterization: one source, one crop, many target sizes.
//!
//! [`Rasterizer::process`] turns a decoded [`SourceImage`], an optional crop
//! rectangle and an ordered list of [`TargetSize`]s into the same number of
//! PNG-encoded rasters, in the same order. Each output is the crop region
//! stretched to exactly `width × height`; there is no letterboxing and no
//! background fill, so transparent pixels stay transparent.
//!
//! ## All or nothing
//!
//! A batch either yields every output or none. The first size that fails to
//! render aborts the batch with [`PipelineError::Encode`] naming its label;
//! outputs already rendered for that batch are dropped.
//!
//! ## Parallel Processing
//!
//! Sizes are rendered on the global [rayon](https://docs.rs/rayon) pool. The
//! indexed `collect` keeps input order no matter which size finishes first.
//! Every size renders into its own scratch surface inside the backend, so
//! nothing is shared between sizes or between concurrent batches.
//!
//! ## Progress
//!
//! Callers that want progress pass an [`mpsc::Sender`](std::sync::mpsc::Sender)
//! and receive [`ProcessEvent`]s as sizes complete. The CLI prints them from a
//! separate thread.

use crate::config::AppConfig;
use crate::geometry::{CropRect, centered_square};
use crate::imaging::{
    BackendError, PixelRect, RasterBackend, RenderParams, Resampling, SourceImage, pixel_rect,
};
use crate::types::TargetSize;
use rayon::prelude::*;
use std::sync::mpsc::Sender;
use thiserror::Error;

/// The payload could not be decoded into a raster.
#[derive(Error, Debug)]
#[error("could not decode image: {source}")]
pub struct DecodeError {
    #[from]
    pub source: BackendError,
}

/// One target size failed to render or encode.
#[derive(Error, Debug)]
#[error("could not encode {label}: {source}")]
pub struct EncodeError {
    pub label: String,
    #[source]
    pub source: BackendError,
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// One rendered output. Has no handle until it is published.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRaster {
    pub size: TargetSize,
    pub bytes: Vec<u8>,
}

/// Progress events emitted while a batch renders.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    /// A batch began.
    Started {
        source_width: u32,
        source_height: u32,
        region: PixelRect,
        total: usize,
    },
    /// One size finished encoding. Arrives in completion order.
    SizeEncoded {
        index: usize,
        label: String,
        width: u32,
        height: u32,
        bytes: usize,
    },
    /// Every size encoded.
    Finished { count: usize },
}

/// Renders batches of target sizes with one backend.
pub struct Rasterizer<B: RasterBackend> {
    backend: B,
    filter: Resampling,
    parallel: bool,
}

impl<B: RasterBackend> Rasterizer<B> {
    /// Bilinear filter, parallel rendering.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            filter: Resampling::default(),
            parallel: true,
        }
    }

    /// Filter and parallelism from the `[raster]` and `[processing]` tables.
    pub fn from_config(backend: B, config: &AppConfig) -> Self {
        Self {
            backend,
            filter: config.raster.filter,
            parallel: config.processing.parallel,
        }
    }

    pub fn with_filter(mut self, filter: Resampling) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn filter(&self) -> Resampling {
        self.filter
    }

    /// Decode an uploaded payload.
    pub fn decode(&self, data: &[u8]) -> Result<SourceImage, DecodeError> {
        let source = self.backend.decode(data)?;
        log::debug!(
            "decoded {} bytes into {}x{} source",
            data.len(),
            source.width(),
            source.height()
        );
        Ok(source)
    }

    /// Render `sizes` from `source`. `None` crops to the centered square.
    pub fn process(
        &self,
        source: &SourceImage,
        sizes: &[TargetSize],
        crop: Option<CropRect>,
    ) -> Result<Vec<EncodedRaster>, PipelineError> {
        self.process_with_progress(source, sizes, crop, None)
    }

    /// Decode `data`, then [`process`](Self::process) it.
    pub fn process_encoded(
        &self,
        data: &[u8],
        sizes: &[TargetSize],
        crop: Option<CropRect>,
    ) -> Result<Vec<EncodedRaster>, PipelineError> {
        let source = self.decode(data)?;
        self.process(&source, sizes, crop)
    }

    /// [`process`](Self::process), reporting progress on `progress`.
    ///
    /// A dropped receiver is ignored: progress is best-effort.
    pub fn process_with_progress(
        &self,
        source: &SourceImage,
        sizes: &[TargetSize],
        crop: Option<CropRect>,
        progress: Option<Sender<ProcessEvent>>,
    ) -> Result<Vec<EncodedRaster>, PipelineError> {
        let (w, h) = (source.width(), source.height());
        let crop = crop.unwrap_or_else(|| centered_square(f64::from(w), f64::from(h)));
        let region = pixel_rect(&crop, w, h);

        log::info!(
            "rendering {} sizes from {}x{}+{}+{} of {}x{} source",
            sizes.len(),
            region.width,
            region.height,
            region.x,
            region.y,
            w,
            h
        );
        if let Some(tx) = &progress {
            tx.send(ProcessEvent::Started {
                source_width: w,
                source_height: h,
                region,
                total: sizes.len(),
            })
            .ok();
        }

        let render_one = |(index, size): (usize, &TargetSize)| {
            let raster = self.render_size(source, region, size)?;
            if let Some(tx) = &progress {
                tx.send(ProcessEvent::SizeEncoded {
                    index,
                    label: size.label.clone(),
                    width: size.width,
                    height: size.height,
                    bytes: raster.bytes.len(),
                })
                .ok();
            }
            Ok::<_, EncodeError>(raster)
        };

        let rendered: Result<Vec<EncodedRaster>, EncodeError> = if self.parallel {
            sizes.par_iter().enumerate().map(render_one).collect()
        } else {
            sizes.iter().enumerate().map(render_one).collect()
        };
        let outputs = rendered.inspect_err(|e| log::warn!("batch aborted: {e}"))?;

        if let Some(tx) = &progress {
            tx.send(ProcessEvent::Finished {
                count: outputs.len(),
            })
            .ok();
        }
        Ok(outputs)
    }

    fn render_size(
        &self,
        source: &SourceImage,
        region: PixelRect,
        size: &TargetSize,
    ) -> Result<EncodedRaster, EncodeError> {
        let params = RenderParams {
            region,
            width: size.width,
            height: size.height,
            filter: self.filter,
        };
        let bytes = self
            .backend
            .render(source, &params)
            .map_err(|source| EncodeError {
                label: size.label.clone(),
                source,
            })?;
        log::debug!(
            "{} ({}x{}): {} bytes",
            size.label,
            size.width,
            size.height,
            bytes.len()
        );
        Ok(EncodedRaster {
            size: size.clone(),
            bytes,
        })
    }
}
