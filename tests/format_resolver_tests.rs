use mesh_preview::formats::{MeshFormat, SUPPORTED_FORMATS};
use mesh_preview::preview::{PreviewConfig, PreviewOrchestrator, PreviewPhase};
use mesh_preview::PreviewError;

use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn every_supported_extension_resolves_to_its_format() {
    for format in SUPPORTED_FORMATS {
        assert_eq!(
            MeshFormat::from_extension(format.extension()),
            Some(format),
            "extension {:?} must resolve",
            format.extension()
        );
        let upper = format.extension().to_uppercase();
        assert_eq!(MeshFormat::from_extension(&upper), Some(format));
    }
}

#[test]
fn unknown_extensions_report_unsupported() {
    for ext in ["xyz", "step", "3mf", "txt", ""] {
        assert_eq!(MeshFormat::from_extension(ext), None);
    }
}

#[test]
fn unsupported_file_fails_without_invoking_loader() {
    let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
    let errors: Rc<RefCell<Vec<String>>> = Rc::default();
    let sink = errors.clone();
    preview.on_error(move |e| sink.borrow_mut().push(e.to_string()));

    preview.set_file("model.xyz", vec![0u8; 128]);

    // Terminal immediately: no load task ever ran, fallback is shown
    assert_eq!(preview.phase(), PreviewPhase::Failed);
    assert!(matches!(
        preview.last_error(),
        Some(PreviewError::UnsupportedFormat { .. })
    ));
    assert_eq!(errors.borrow().len(), 1);
    assert!(errors.borrow()[0].contains("xyz"));

    // Even many frames later nothing changes
    for _ in 0..20 {
        preview.update(0.1);
    }
    assert_eq!(preview.phase(), PreviewPhase::Failed);
    assert_eq!(errors.borrow().len(), 1);
    assert!(preview.dimensions().is_none());
}

#[test]
fn fallback_frame_is_a_single_box() {
    let mut preview = PreviewOrchestrator::new(PreviewConfig::default());
    preview.set_file("model.xyz", vec![0u8]);

    let frame = preview.frame();
    let scene = frame.scene.expect("fallback scene should be drawn");
    assert_eq!(scene.mesh_count(), 1);
    let bounds = scene.bounds();
    assert_eq!(bounds.size(), glam::Vec3::ONE);
}
