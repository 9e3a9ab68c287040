use super::*;

struct FailingPreviews;

impl PreviewBackend for FailingPreviews {
    fn acquire(&self, file: &UploadFile) -> Result<PreviewHandle> {
        anyhow::bail!("cannot preview {}", file.filename)
    }

    fn release(&self, _handle: PreviewHandle) {}

    fn live_count(&self) -> usize {
        0
    }
}

fn files(names: &[&str]) -> Vec<UploadFile> {
    names
        .iter()
        .map(|name| UploadFile::from_bytes(*name, name.as_bytes().to_vec()))
        .collect()
}

#[test]
fn temp_file_handles_are_deleted_on_release() {
    let backend = TempFilePreviews::default();
    let handle = backend
        .acquire(&UploadFile::from_bytes("harp.png", b"png-bytes".to_vec()))
        .expect("acquire");

    let PreviewLocator::Path(path) = handle.locator.clone() else {
        panic!("expected a path locator");
    };
    assert_eq!(std::fs::read(&path).expect("read preview"), b"png-bytes");
    assert!(path.to_string_lossy().ends_with(".png"));
    assert_eq!(backend.live_count(), 1);

    backend.release(handle);
    assert_eq!(backend.live_count(), 0);
    assert!(!path.exists());
}

#[test]
fn memory_handles_resolve_until_released() {
    let backend = MemoryPreviews::default();
    let handle = backend
        .acquire(&UploadFile::from_bytes("drum.wav", b"riff".to_vec()))
        .expect("acquire");

    assert_eq!(
        backend.resolve(&handle).as_deref(),
        Some(b"riff".as_slice())
    );
    assert!(matches!(&handle.locator, PreviewLocator::Memory(uri) if uri.starts_with("memory://")));

    backend.release(handle.clone());
    assert!(backend.resolve(&handle).is_none());
}

#[test]
fn replacing_selection_never_leaves_two_live_handles_per_slot() {
    let backend = Arc::new(MemoryPreviews::default());
    let mut slots = PreviewSlots::new(backend.clone());

    slots.replace_all(&files(&["a.png", "b.png", "c.png"]));
    assert_eq!(backend.live_count(), 3);

    for _ in 0..5 {
        slots.replace_all(&files(&["d.png", "e.png"]));
    }
    assert_eq!(backend.live_count(), 2);
    assert_eq!(slots.len(), 2);
}

#[test]
fn removing_a_slot_releases_only_that_handle() {
    let backend = Arc::new(MemoryPreviews::default());
    let mut slots = PreviewSlots::new(backend.clone());
    slots.replace_all(&files(&["a.png", "b.png", "c.png"]));

    slots.remove(1);
    let remaining: Vec<_> = slots
        .handles()
        .into_iter()
        .flatten()
        .map(|h| h.filename)
        .collect();
    assert_eq!(remaining, vec!["a.png", "c.png"]);
    assert_eq!(backend.live_count(), 2);

    slots.remove(9);
    assert_eq!(backend.live_count(), 2);
}

#[test]
fn dropping_slots_releases_everything() {
    let backend = Arc::new(MemoryPreviews::default());
    {
        let mut slots = PreviewSlots::new(backend.clone());
        slots.replace_all(&files(&["a.png", "b.png"]));
        assert_eq!(backend.live_count(), 2);
    }
    assert_eq!(backend.live_count(), 0);
}

#[test]
fn failed_acquisition_leaves_empty_slot() {
    let mut slots = PreviewSlots::new(Arc::new(FailingPreviews));
    slots.replace_all(&files(&["a.png"]));
    assert_eq!(slots.handles(), vec![None]);
}
