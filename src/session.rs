//! One editing session: a source image, its crop, a platform and its outputs.
//!
//! [`Session`] ties the editor, the pipeline and the resource manager
//! together and enforces when outputs stay valid:
//!
//! - Loading an image, changing the crop and clearing the image all discard
//!   the current outputs and the selected platform.
//! - Selecting a platform is the commit action. It returns a [`Job`] that
//!   can run on any thread; its [`JobOutcome`] comes back through
//!   [`Session::finish`].
//!
//! ## Generations
//!
//! Every state change that invalidates outputs, and every new job, bumps a
//! generation counter. Jobs carry the generation they were started in, and
//! `finish` drops outcomes from an older generation without publishing them.
//! A stale outcome never touches the processing flag; only the current job's
//! outcome clears it.
//!
//! ## Failure
//!
//! A failed job leaves the previous outputs published and live, and the
//! platform they were rendered for stays selected. A successful one releases
//! them before storing the new set and its platform.

use crate::config::AppConfig;
use crate::editor::{CropEditor, Layout, PointerTarget};
use crate::export::{self, BundleError, ExportError, Sink};
use crate::geometry::{CropRect, Point};
use crate::imaging::{RasterBackend, SourceImage};
use crate::pipeline::{DecodeError, EncodedRaster, PipelineError, ProcessEvent, Rasterizer};
use crate::presets;
use crate::resources::{GeneratedOutput, OutputManager, OutputSet};
use crate::types::{PlatformPreset, TargetSize};
use crate::upload::{Upload, ValidationError};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error("no image loaded")]
    NoImage,
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
    #[error("no outputs generated")]
    NoOutputs,
    #[error("output index {index} out of range (have {len})")]
    OutputIndex { index: usize, len: usize },
}

/// What [`Session::finish`] did with an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Published this many outputs.
    Ready(usize),
    /// The session moved on; the outcome was discarded.
    Stale,
}

/// A batch ready to render, detached from the session.
pub struct Job<B: RasterBackend> {
    generation: u64,
    rasterizer: Arc<Rasterizer<B>>,
    source: SourceImage,
    crop: CropRect,
    platform: PlatformPreset,
}

impl<B: RasterBackend> Job<B> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn platform(&self) -> &PlatformPreset {
        &self.platform
    }

    pub fn sizes(&self) -> &[TargetSize] {
        &self.platform.sizes
    }

    pub fn crop(&self) -> CropRect {
        self.crop
    }

    /// Render the batch. Blocks until every size is done.
    pub fn run(self, progress: Option<Sender<ProcessEvent>>) -> JobOutcome {
        let result = self.rasterizer.process_with_progress(
            &self.source,
            &self.platform.sizes,
            Some(self.crop),
            progress,
        );
        JobOutcome {
            generation: self.generation,
            platform: self.platform,
            result,
        }
    }
}

/// The result of [`Job::run`], tagged with the job's generation and platform.
#[derive(Debug)]
pub struct JobOutcome {
    pub generation: u64,
    pub platform: PlatformPreset,
    pub result: Result<Vec<EncodedRaster>, PipelineError>,
}

struct LoadedImage<L: Layout> {
    name: String,
    source: SourceImage,
    editor: CropEditor<L>,
}

pub struct Session<L: Layout, B: RasterBackend> {
    config: AppConfig,
    catalog: Vec<PlatformPreset>,
    rasterizer: Arc<Rasterizer<B>>,
    manager: Arc<OutputManager>,
    image: Option<LoadedImage<L>>,
    platform: Option<PlatformPreset>,
    outputs: Option<OutputSet>,
    generation: u64,
    processing: bool,
}

impl<L: Layout, B: RasterBackend> Session<L, B> {
    pub fn new(config: AppConfig, backend: B) -> Self {
        let rasterizer = Arc::new(Rasterizer::from_config(backend, &config));
        let catalog = presets::catalog(&config.platforms);
        Self {
            config,
            catalog,
            rasterizer,
            manager: OutputManager::new(),
            image: None,
            platform: None,
            outputs: None,
            generation: 0,
            processing: false,
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn catalog(&self) -> &[PlatformPreset] {
        &self.catalog
    }

    pub fn manager(&self) -> &Arc<OutputManager> {
        &self.manager
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_processing(&self) -> bool {
        self.processing
    }

    /// The platform the current outputs were rendered for.
    pub fn platform(&self) -> Option<&PlatformPreset> {
        self.platform.as_ref()
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.image.as_ref().map(|i| &i.source)
    }

    pub fn image_name(&self) -> Option<&str> {
        self.image.as_ref().map(|i| i.name.as_str())
    }

    pub fn crop(&self) -> Option<CropRect> {
        self.image.as_ref().map(|i| i.editor.rect())
    }

    pub fn editor(&self) -> Option<&CropEditor<L>> {
        self.image.as_ref().map(|i| &i.editor)
    }

    /// Current outputs, empty when none are published.
    pub fn outputs(&self) -> &[GeneratedOutput] {
        self.outputs.as_ref().map_or(&[], |set| set.outputs())
    }

    /// Drop outputs and platform; anything in flight becomes stale.
    fn invalidate(&mut self) {
        if let Some(mut set) = self.outputs.take() {
            set.release();
        }
        self.platform = None;
        self.processing = false;
        self.generation += 1;
    }

    // =========================================================================
    // Image
    // =========================================================================

    /// Validate and decode `upload`, replacing any current image.
    ///
    /// On failure the current image and outputs are kept.
    pub fn load(&mut self, upload: &Upload, layout: L) -> Result<&SourceImage, SessionError> {
        upload.validate(&self.config.upload)?;
        let source = self.rasterizer.decode(&upload.bytes)?;
        let editor = CropEditor::new(
            layout,
            source.width(),
            source.height(),
            self.config.editor.min_dim,
        )
        .with_handle_hit_size(self.config.editor.handle_hit_size);
        log::info!(
            "loaded {} ({}x{})",
            upload.name,
            source.width(),
            source.height()
        );

        self.invalidate();
        let image = self.image.insert(LoadedImage {
            name: upload.name.clone(),
            source,
            editor,
        });
        Ok(&image.source)
    }

    /// Forget the image, its crop, the platform and the outputs.
    pub fn clear_image(&mut self) {
        self.image = None;
        self.invalidate();
    }

    // =========================================================================
    // Crop editing
    // =========================================================================

    fn edit(&mut self, f: impl FnOnce(&mut CropEditor<L>) -> bool) -> bool {
        let Some(image) = self.image.as_mut() else {
            return false;
        };
        let changed = f(&mut image.editor);
        if changed {
            log::debug!("crop changed to {:?}", image.editor.rect());
            self.invalidate();
        }
        changed
    }

    /// Press at a rendered position, hit-testing for handles.
    pub fn pointer_down(&mut self, pos: Point) -> bool {
        self.image
            .as_mut()
            .is_some_and(|image| image.editor.press_at(pos))
    }

    /// Press with a target the caller already resolved.
    pub fn pointer_down_on(&mut self, pos: Point, target: PointerTarget) -> bool {
        self.image
            .as_mut()
            .is_some_and(|image| image.editor.on_pointer_down(pos, target))
    }

    /// Returns `true` when the crop changed (and outputs were discarded).
    pub fn pointer_move(&mut self, pos: Point) -> bool {
        self.edit(|editor| editor.on_pointer_move(pos))
    }

    pub fn pointer_up(&mut self) {
        if let Some(image) = self.image.as_mut() {
            image.editor.on_pointer_up();
        }
    }

    pub fn pointer_leave(&mut self) {
        if let Some(image) = self.image.as_mut() {
            image.editor.on_pointer_leave();
        }
    }

    /// Set the crop directly (constrained to the source).
    pub fn place_crop(&mut self, rect: CropRect) -> Result<bool, SessionError> {
        if self.image.is_none() {
            return Err(SessionError::NoImage);
        }
        Ok(self.edit(|editor| editor.place(rect)))
    }

    /// Back to the centered max square.
    pub fn reset_crop(&mut self) -> Result<bool, SessionError> {
        if self.image.is_none() {
            return Err(SessionError::NoImage);
        }
        Ok(self.edit(|editor| editor.reset()))
    }

    // =========================================================================
    // Generation
    // =========================================================================

    /// Look up a catalog preset by id.
    pub fn preset(&self, id: &str) -> Result<&PlatformPreset, SessionError> {
        presets::find(&self.catalog, id).ok_or_else(|| SessionError::UnknownPlatform(id.into()))
    }

    /// Commit to `preset` and hand back the job that renders it.
    pub fn select_platform(&mut self, preset: &PlatformPreset) -> Result<Job<B>, SessionError> {
        let image = self.image.as_ref().ok_or(SessionError::NoImage)?;
        let crop = image.editor.rect();
        let source = image.source.clone();

        self.generation += 1;
        self.processing = true;
        log::info!(
            "generating {} ({} sizes), generation {}",
            preset.id,
            preset.sizes.len(),
            self.generation
        );
        Ok(Job {
            generation: self.generation,
            rasterizer: Arc::clone(&self.rasterizer),
            source,
            crop,
            platform: preset.clone(),
        })
    }

    /// [`select_platform`](Self::select_platform) by catalog id.
    pub fn select_platform_id(&mut self, id: &str) -> Result<Job<B>, SessionError> {
        let preset = self.preset(id)?.clone();
        self.select_platform(&preset)
    }

    /// Accept a job's outcome.
    pub fn finish(&mut self, outcome: JobOutcome) -> Result<Completion, SessionError> {
        if outcome.generation != self.generation {
            log::debug!(
                "discarding outcome of generation {} (now {})",
                outcome.generation,
                self.generation
            );
            return Ok(Completion::Stale);
        }
        self.processing = false;
        let JobOutcome {
            platform, result, ..
        } = outcome;
        let rasters = result?;

        if let Some(mut previous) = self.outputs.take() {
            previous.release();
        }
        let set = self.manager.publish(rasters);
        let count = set.len();
        self.outputs = Some(set);
        self.platform = Some(platform);
        Ok(Completion::Ready(count))
    }

    /// Select, run and finish in one call, on the current thread.
    pub fn generate(
        &mut self,
        preset: &PlatformPreset,
        progress: Option<Sender<ProcessEvent>>,
    ) -> Result<Completion, SessionError> {
        let job = self.select_platform(preset)?;
        let outcome = job.run(progress);
        self.finish(outcome)
    }

    // =========================================================================
    // Export
    // =========================================================================

    /// Persist output `index` under its label.
    pub fn export_single(&self, index: usize, sink: &impl Sink) -> Result<String, SessionError> {
        let outputs = self.outputs();
        if outputs.is_empty() {
            return Err(SessionError::NoOutputs);
        }
        let output = outputs.get(index).ok_or(SessionError::OutputIndex {
            index,
            len: outputs.len(),
        })?;
        Ok(export::export_single(output, sink)?)
    }

    /// Persist every output as one zip named after the platform.
    pub fn export_bundle(&self, sink: &impl Sink) -> Result<String, SessionError> {
        let outputs = self.outputs();
        if outputs.is_empty() {
            return Err(SessionError::NoOutputs);
        }
        let name = self.platform.as_ref().map_or("icons", |p| p.name.as_str());
        Ok(export::export_bundle(outputs, name, sink)?)
    }
}
