use super::alpha::AlphaMap;
use super::composite;
use super::postprocess;
use super::preprocess::Preprocessor;
use super::profile::{ModelProfile, SizePolicy};
use crate::engine::{ExecutionProvider, InferenceEngine, OnnxEngine};
use crate::error::{MatteError, Result};
use image::RgbaImage;
use std::path::Path;
use std::time::Instant;

/// Lifecycle state of a matting pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No engine loaded yet
    Uninitialized,
    /// Engine loaded, ready to process
    Ready,
    /// The last load failed; processing is rejected until a load succeeds
    LoadFailed,
}

/// End-to-end portrait matting over one model
///
/// Sequences preprocess, inference, postprocess and composite, owns the
/// engine handle for its lifetime and keeps the most recent alpha map
/// around for export. One instance serves one model; `&mut self` on
/// `process` keeps calls strictly serial.
pub struct MattingPipeline {
    profile: ModelProfile,
    preprocessor: Preprocessor,
    engine: Option<Box<dyn InferenceEngine>>,
    state: PipelineState,
    last_alpha: Option<AlphaMap>,
}

impl MattingPipeline {
    /// Create an uninitialized pipeline for the given model profile
    pub fn new(profile: ModelProfile) -> Result<Self> {
        let preprocessor = Preprocessor::new(profile)?;
        Ok(Self {
            profile,
            preprocessor,
            engine: None,
            state: PipelineState::Uninitialized,
            last_alpha: None,
        })
    }

    /// Load an ONNX model and make the pipeline ready
    ///
    /// On failure the pipeline enters LoadFailed and every process() call is
    /// rejected until a later load succeeds.
    pub fn initialize<P: AsRef<Path>>(
        &mut self,
        model_path: P,
        provider: ExecutionProvider,
    ) -> Result<()> {
        match OnnxEngine::load(model_path, provider) {
            Ok(engine) => self.initialize_with(Box::new(engine)),
            Err(err) => {
                self.engine = None;
                self.state = PipelineState::LoadFailed;
                Err(err)
            }
        }
    }

    /// Make the pipeline ready with a caller-supplied engine
    pub fn initialize_with(&mut self, engine: Box<dyn InferenceEngine>) -> Result<()> {
        // A fixed-size profile defers to the dimensions the model declares
        if let SizePolicy::Fixed { .. } = self.profile.size_policy {
            if let Some((width, height)) = engine.info().input_size {
                tracing::debug!("Adopting model input size {}x{}", width, height);
                self.profile.size_policy = SizePolicy::Fixed { width, height };
                self.preprocessor = Preprocessor::new(self.profile)?;
            }
        }

        tracing::info!(
            "Pipeline ready (input '{}', output '{}')",
            engine.info().input_name,
            engine.info().output_name
        );
        self.engine = Some(engine);
        self.state = PipelineState::Ready;
        Ok(())
    }

    /// Matte an image and composite the alpha back onto it
    ///
    /// Runs preprocess, inference, postprocess and composite in order and
    /// caches the alpha map as the last result. Fails with NotInitialized
    /// unless a model is loaded; a stage error propagates and leaves the
    /// pipeline ready for the next call.
    pub fn process(&mut self, image: &RgbaImage) -> Result<RgbaImage> {
        if self.state != PipelineState::Ready {
            return Err(MatteError::NotInitialized);
        }
        let engine = self.engine.as_mut().ok_or(MatteError::NotInitialized)?;

        let prepare_start = Instant::now();
        let prepared = self.preprocessor.prepare(image)?;
        let prepare_time = prepare_start.elapsed();

        let inference_start = Instant::now();
        let raw = engine.run(prepared.tensor)?;
        let inference_time = inference_start.elapsed();

        let finish_start = Instant::now();
        let alpha = postprocess::postprocess_alpha(&raw, prepared.original_size)?;
        let result = composite::composite(image, &alpha, self.profile.output_policy)?;
        let finish_time = finish_start.elapsed();

        self.last_alpha = Some(alpha);

        tracing::debug!(
            "Processed {}x{}: preprocess={:.1}ms, inference={:.1}ms, finish={:.1}ms",
            prepared.original_size.0,
            prepared.original_size.1,
            prepare_time.as_secs_f64() * 1000.0,
            inference_time.as_secs_f64() * 1000.0,
            finish_time.as_secs_f64() * 1000.0,
        );

        Ok(result)
    }

    /// Like process(), but degrades instead of failing: on any error the
    /// error is logged and the source image comes back unmodified
    pub fn process_with_fallback(&mut self, image: &RgbaImage) -> RgbaImage {
        match self.process(image) {
            Ok(result) => result,
            Err(err) => {
                tracing::error!("Matting failed, passing source through: {}", err);
                image.clone()
            }
        }
    }

    /// Alpha map from the most recent successful process() call
    pub fn last_alpha(&self) -> Option<&AlphaMap> {
        self.last_alpha.as_ref()
    }

    /// Current lifecycle state
    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == PipelineState::Ready
    }

    /// The profile in effect (Fixed dims may have been adopted from the model)
    pub fn profile(&self) -> &ModelProfile {
        &self.profile
    }

    /// Release the engine and cached results, returning to Uninitialized
    pub fn shutdown(&mut self) {
        if self.engine.is_some() {
            tracing::info!("Shutting down matting pipeline");
        }
        self.engine = None;
        self.last_alpha = None;
        self.state = PipelineState::Uninitialized;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SessionInfo;
    use crate::matting::{Normalization, OutputPolicy};
    use image::Rgba;
    use ndarray::Array4;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Engine that answers with a constant alpha field at the input size
    struct FakeEngine {
        info: SessionInfo,
        value: f32,
        calls: Rc<Cell<usize>>,
    }

    impl FakeEngine {
        fn boxed(value: f32, input_size: Option<(u32, u32)>) -> (Box<Self>, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            let engine = Box::new(Self {
                info: SessionInfo {
                    input_name: "src".to_string(),
                    output_name: "alpha".to_string(),
                    input_size,
                },
                value,
                calls: Rc::clone(&calls),
            });
            (engine, calls)
        }
    }

    impl InferenceEngine for FakeEngine {
        fn info(&self) -> &SessionInfo {
            &self.info
        }

        fn run(&mut self, input: Array4<f32>) -> Result<Array4<f32>> {
            self.calls.set(self.calls.get() + 1);
            let height = input.shape()[2];
            let width = input.shape()[3];
            Ok(Array4::from_elem((1, 1, height, width), self.value))
        }
    }

    struct FailingEngine {
        info: SessionInfo,
    }

    impl FailingEngine {
        fn boxed() -> Box<Self> {
            Box::new(Self {
                info: SessionInfo {
                    input_name: "src".to_string(),
                    output_name: "alpha".to_string(),
                    input_size: None,
                },
            })
        }
    }

    impl InferenceEngine for FailingEngine {
        fn info(&self) -> &SessionInfo {
            &self.info
        }

        fn run(&mut self, _input: Array4<f32>) -> Result<Array4<f32>> {
            Err(MatteError::Inference {
                reason: "synthetic failure".to_string(),
            })
        }
    }

    fn small_profile() -> ModelProfile {
        let mut profile = ModelProfile::soft_matte();
        profile.size_policy = SizePolicy::AspectMultipleOf32 { ref_size: 32 };
        profile
    }

    fn test_image() -> RgbaImage {
        RgbaImage::from_pixel(50, 40, Rgba([10, 20, 30, 255]))
    }

    #[test]
    fn process_before_initialize_is_rejected() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);

        let err = pipeline.process(&test_image()).unwrap_err();
        assert!(matches!(err, MatteError::NotInitialized));
    }

    #[test]
    fn failed_load_blocks_processing_until_a_new_load() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();

        let err = pipeline
            .initialize("/no/such/model.onnx", ExecutionProvider::Cpu)
            .unwrap_err();
        assert!(matches!(err, MatteError::ModelLoad { .. }));
        assert_eq!(pipeline.state(), PipelineState::LoadFailed);

        let err = pipeline.process(&test_image()).unwrap_err();
        assert!(matches!(err, MatteError::NotInitialized));

        // A later successful load recovers the pipeline
        let (engine, calls) = FakeEngine::boxed(0.5, None);
        pipeline.initialize_with(engine).unwrap();
        assert!(pipeline.is_ready());
        pipeline.process(&test_image()).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn output_matches_source_dimensions() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        let (engine, _calls) = FakeEngine::boxed(0.5, None);
        pipeline.initialize_with(engine).unwrap();

        let image = test_image();
        let result = pipeline.process(&image).unwrap();
        assert_eq!(result.dimensions(), image.dimensions());

        let alpha = pipeline.last_alpha().unwrap();
        assert_eq!(alpha.dimensions(), image.dimensions());
    }

    #[test]
    fn constant_alpha_survives_the_round_trip_exactly() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        let (engine, _calls) = FakeEngine::boxed(0.5, None);
        pipeline.initialize_with(engine).unwrap();

        let result = pipeline.process(&test_image()).unwrap();

        for &value in pipeline.last_alpha().unwrap().data() {
            assert_eq!(value, 0.5);
        }
        for pixel in result.pixels() {
            assert_eq!(pixel[3], 128);
            assert_eq!((pixel[0], pixel[1], pixel[2]), (10, 20, 30));
        }
    }

    #[test]
    fn identical_calls_produce_identical_bytes() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        let (engine, calls) = FakeEngine::boxed(0.42, None);
        pipeline.initialize_with(engine).unwrap();

        let image = test_image();
        let first = pipeline.process(&image).unwrap();
        let second = pipeline.process(&image).unwrap();
        assert_eq!(first.as_raw(), second.as_raw());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn model_metadata_overrides_fixed_dimensions() {
        let mut pipeline = MattingPipeline::new(ModelProfile::hard_cutout()).unwrap();
        let (engine, _calls) = FakeEngine::boxed(1.0, Some((320, 256)));
        pipeline.initialize_with(engine).unwrap();

        assert_eq!(
            pipeline.profile().size_policy,
            SizePolicy::Fixed {
                width: 320,
                height: 256
            }
        );

        // Still composites back at source resolution
        let image = test_image();
        let result = pipeline.process(&image).unwrap();
        assert_eq!(result.dimensions(), image.dimensions());
    }

    #[test]
    fn aspect_profiles_ignore_model_metadata() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        let (engine, _calls) = FakeEngine::boxed(1.0, Some((320, 256)));
        pipeline.initialize_with(engine).unwrap();

        assert_eq!(
            pipeline.profile().size_policy,
            SizePolicy::AspectMultipleOf32 { ref_size: 32 }
        );
    }

    #[test]
    fn thresholded_profile_binarizes_at_composite_time() {
        let mut profile = ModelProfile::new(
            SizePolicy::AspectMultipleOf32 { ref_size: 32 },
            Normalization::ZeroToOne,
            OutputPolicy::Thresholded { threshold: 0.65 },
        );

        let mut pipeline = MattingPipeline::new(profile).unwrap();
        let (engine, _calls) = FakeEngine::boxed(0.70, None);
        pipeline.initialize_with(engine).unwrap();
        let result = pipeline.process(&test_image()).unwrap();
        assert!(result.pixels().all(|p| p[3] == 255));

        // Exactly at the threshold means transparent
        profile.output_policy = OutputPolicy::Thresholded { threshold: 0.70 };
        let mut pipeline = MattingPipeline::new(profile).unwrap();
        let (engine, _calls) = FakeEngine::boxed(0.70, None);
        pipeline.initialize_with(engine).unwrap();
        let result = pipeline.process(&test_image()).unwrap();
        assert!(result.pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn engine_failure_leaves_the_pipeline_ready() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        pipeline.initialize_with(FailingEngine::boxed()).unwrap();

        let err = pipeline.process(&test_image()).unwrap_err();
        assert!(matches!(err, MatteError::Inference { .. }));
        assert_eq!(pipeline.state(), PipelineState::Ready);
        assert!(pipeline.last_alpha().is_none());

        // Swapping in a working engine needs no reconstruction
        let (engine, _calls) = FakeEngine::boxed(0.5, None);
        pipeline.initialize_with(engine).unwrap();
        assert!(pipeline.process(&test_image()).is_ok());
    }

    #[test]
    fn fallback_returns_the_source_unchanged() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        pipeline.initialize_with(FailingEngine::boxed()).unwrap();

        let image = test_image();
        let result = pipeline.process_with_fallback(&image);
        assert_eq!(result.as_raw(), image.as_raw());
    }

    #[test]
    fn shutdown_clears_engine_and_cache() {
        let mut pipeline = MattingPipeline::new(small_profile()).unwrap();
        let (engine, calls) = FakeEngine::boxed(0.5, None);
        pipeline.initialize_with(engine).unwrap();
        pipeline.process(&test_image()).unwrap();
        assert!(pipeline.last_alpha().is_some());
        assert_eq!(calls.get(), 1);

        pipeline.shutdown();
        assert_eq!(pipeline.state(), PipelineState::Uninitialized);
        assert!(pipeline.last_alpha().is_none());
        assert!(matches!(
            pipeline.process(&test_image()),
            Err(MatteError::NotInitialized)
        ));
        // The rejected call never reached an engine
        assert_eq!(calls.get(), 1);
    }
}
