use crate::detector::{DetectionBackend, DetectionResult, InferenceRunner};
use crate::error::Result;
use crate::model::{AssetResolver, ModelHub, ModelReference};
use crate::present::Presenter;
use std::path::Path;

pub enum ModelSource {
    Reference(ModelReference),
    /// Registry alias or compact `namespace/name:filename` reference.
    Name(String),
}

/// Resolve, load, detect, present. Each stage runs once and any failure
/// stops the sequence before the next stage starts.
pub fn detect_once<H, B, L>(
    resolver: &mut AssetResolver<H>,
    source: &ModelSource,
    load: L,
    image: &Path,
    presenter: &dyn Presenter,
) -> Result<DetectionResult>
where
    H: ModelHub,
    B: DetectionBackend,
    L: FnOnce(&Path, &str) -> Result<InferenceRunner<B>>,
{
    let model = match source {
        ModelSource::Reference(reference) => resolver.resolve(reference, None)?,
        ModelSource::Name(name) => resolver.resolve_name(name)?,
    };

    let mut runner = load(&model.model_path, &model.reference.to_string())?;
    let result = runner.run(image)?;

    presenter.present(&result)?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::runner::tests::{detection, write_image, StaticBackend};
    use crate::error::Error;
    use crate::model::resolver::tests::FakeHub;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct RecordingPresenter {
        seen: RefCell<Vec<usize>>,
    }

    impl Presenter for RecordingPresenter {
        fn present(&self, result: &DetectionResult) -> Result<()> {
            self.seen.borrow_mut().push(result.detections.len());
            Ok(())
        }
    }

    fn resolver(dir: &Path, offline: bool) -> AssetResolver<FakeHub> {
        let hub = FakeHub::new(&dir.join("cache")).with_file("org/model", "weights.bin", b"w");
        AssetResolver::new(hub, dir.join("models.toml"), offline).unwrap()
    }

    fn reference(filename: &str) -> ModelSource {
        ModelSource::Reference(ModelReference::new("org/model", filename, None).unwrap())
    }

    fn static_loader(
        loads: &Cell<usize>,
    ) -> impl FnOnce(&Path, &str) -> Result<InferenceRunner<StaticBackend>> + '_ {
        move |path, model| {
            assert!(path.exists());
            loads.set(loads.get() + 1);
            Ok(InferenceRunner::with_backend(
                StaticBackend::new(vec![detection("button", 0.8, [1.0, 1.0, 20.0, 20.0])]),
                model,
            ))
        }
    }

    #[test]
    fn end_to_end_run_produces_detections() {
        let tmp = tempfile::tempdir().unwrap();
        let image = write_image(tmp.path(), "sample.png");
        let mut resolver = resolver(tmp.path(), false);
        let presenter = RecordingPresenter::default();
        let loads = Cell::new(0);

        let result = detect_once(
            &mut resolver,
            &reference("weights.bin"),
            static_loader(&loads),
            &image,
            &presenter,
        )
        .unwrap();

        assert!(!result.detections.is_empty());
        assert_eq!(result.model, "org/model:weights.bin");
        assert_eq!(*presenter.seen.borrow(), vec![1]);
        assert_eq!(loads.get(), 1);
    }

    #[test]
    fn missing_image_skips_presentation() {
        let tmp = tempfile::tempdir().unwrap();
        let mut resolver = resolver(tmp.path(), false);
        let presenter = RecordingPresenter::default();
        let loads = Cell::new(0);

        let err = detect_once(
            &mut resolver,
            &reference("weights.bin"),
            static_loader(&loads),
            &tmp.path().join("sample.png"),
            &presenter,
        )
        .unwrap_err();

        assert!(matches!(err, Error::ImageDecode(_)));
        assert!(presenter.seen.borrow().is_empty());
    }

    #[test]
    fn missing_asset_stops_before_inference() {
        let tmp = tempfile::tempdir().unwrap();
        let image = write_image(tmp.path(), "sample.png");
        let mut resolver = resolver(tmp.path(), false);
        let presenter = RecordingPresenter::default();
        let loads = Cell::new(0);

        let err = detect_once(
            &mut resolver,
            &reference("nope.bin"),
            static_loader(&loads),
            &image,
            &presenter,
        )
        .unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(loads.get(), 0);
        assert!(presenter.seen.borrow().is_empty());
    }

    #[test]
    fn repeated_runs_reuse_the_cached_asset() {
        let tmp = tempfile::tempdir().unwrap();
        let image = write_image(tmp.path(), "sample.png");
        let presenter = RecordingPresenter::default();
        let loads = Cell::new(0);

        let mut first = resolver(tmp.path(), false);
        detect_once(&mut first, &reference("weights.bin"), static_loader(&loads), &image, &presenter)
            .unwrap();

        // A fresh resolver over the same cache, as on a second process run.
        let mut second = resolver(tmp.path(), false);
        detect_once(
            &mut second,
            &ModelSource::Name("org/model:weights.bin".to_string()),
            static_loader(&loads),
            &image,
            &presenter,
        )
        .unwrap();

        assert_eq!(first.hub().downloads.get(), 1);
        assert_eq!(second.hub().downloads.get(), 0);
        assert_eq!(first.registry().list_models().len(), 1);
        assert_eq!(loads.get(), 2);
        assert_eq!(presenter.seen.borrow().len(), 2);
    }
}
