#![allow(missing_docs)]

use std::error::Error;

use slabio_filesystem::FilesystemBackend;
use slabio_storage::{
    backend_test, CodecKind, Compression, DataType, DatasetMetadata, DatasetName,
    GzipCompressionLevel, StorageBackendTraits, StorageError, UNLIMITED,
};

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let container = path.path().join("nested").join("data.slab");
    let storage = FilesystemBackend::new();
    backend_test::backend_containers(&storage, &container)?;
    backend_test::backend_write_read(&storage, &container)?;
    backend_test::backend_extend(&storage, &container)?;
    backend_test::backend_not_found(&storage, &container)?;
    backend_test::backend_nested_names(&storage, &container)?;
    backend_test::backend_erase(&storage, &container)?;
    assert_eq!(storage.open_handles(), 0);

    assert!(container.join("container.json").is_file());
    assert!(container.join("run1").join("energy").join("dataset.json").is_file());
    assert!(container.join("extend").join("c").join("0").join("0").is_file());
    // the second row was discarded by shrinking
    assert!(!container.join("extend").join("c").join("1").join("0").exists());
    assert!(container.join("erase").join("sibling").join("dataset.json").is_file());
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem_persistence() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let container = path.path().join("data.slab");
    let name = DatasetName::new("table")?;
    let bytes: Vec<u8> = (0..8).collect();
    {
        let storage = FilesystemBackend::new();
        let file = storage.create_container(&container)?;
        let metadata = DatasetMetadata::new(
            DataType::UInt8,
            [0, 4].into(),
            [UNLIMITED, 4].into(),
            [1, 4].into(),
            None,
        )?;
        let dataset = storage.create_dataset(&file, &name, &metadata)?;
        storage.extend_dataset(&dataset, &[2, 4])?;
        let space = storage.dataset_space(&dataset)?;
        storage.write(&dataset, &space, &space, DataType::UInt8, &bytes)?;
    }

    let storage = FilesystemBackend::new();
    let file = storage.open_container(&container)?;
    let dataset = storage.open_dataset(&file, &name)?;
    let space = storage.dataset_space(&dataset)?;
    assert_eq!(space.dims(), &[2, 4]);
    assert!(space.is_unlimited(0));
    let mut out = vec![0; 8];
    storage.read(&dataset, &space, &space, DataType::UInt8, &mut out)?;
    assert_eq!(out, bytes);

    let document = std::fs::read_to_string(container.join("table").join("dataset.json"))?;
    let document: serde_json::Value = serde_json::from_str(&document)?;
    assert_eq!(document["max_shape"], serde_json::json!([null, 4]));
    assert_eq!(document["data_type"], "uint8");
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem_never_truncates() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let container = path.path().join("data.slab");
    let storage = FilesystemBackend::new();
    let file = storage.create_container(&container)?;
    let metadata = DatasetMetadata::new(DataType::UInt8, [2].into(), [2].into(), [2].into(), None)?;
    let name = DatasetName::new("data")?;
    storage.create_dataset(&file, &name, &metadata)?;
    drop(file);

    assert!(matches!(
        storage.create_container(&container),
        Err(StorageError::ContainerExists(_))
    ));
    let file = storage.open_container(&container)?;
    assert!(storage.open_dataset(&file, &name).is_ok());
    Ok(())
}

#[test]
#[cfg_attr(miri, ignore)]
fn filesystem_gzip() -> Result<(), Box<dyn Error>> {
    let path = tempfile::TempDir::new()?;
    let container = path.path().join("data.slab");
    let storage = FilesystemBackend::new();
    let file = storage.create_container(&container)?;
    let metadata = DatasetMetadata::new(
        DataType::UInt8,
        [64, 64].into(),
        [64, 64].into(),
        [64, 64].into(),
        Some(Compression::Gzip(GzipCompressionLevel::try_from(6u32)?)),
    )?;
    let name = DatasetName::new("compressed")?;
    if !storage.codec_available(CodecKind::Gzip) {
        assert!(matches!(
            storage.create_dataset(&file, &name, &metadata),
            Err(StorageError::UnsupportedCodec(CodecKind::Gzip))
        ));
        return Ok(());
    }

    let dataset = storage.create_dataset(&file, &name, &metadata)?;
    let space = storage.dataset_space(&dataset)?;
    let bytes: Vec<u8> = (0..64 * 64).map(|i| (i % 7) as u8).collect();
    storage.write(&dataset, &space, &space, DataType::UInt8, &bytes)?;
    let chunk = std::fs::read(container.join("compressed").join("c").join("0").join("0"))?;
    assert!(chunk.len() < bytes.len());

    let mut out = vec![0; bytes.len()];
    storage.read(&dataset, &space, &space, DataType::UInt8, &mut out)?;
    assert_eq!(out, bytes);
    Ok(())
}
