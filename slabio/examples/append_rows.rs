#![allow(missing_docs)]

use std::sync::Arc;

use slabio::array_io::ArrayIO;
use slabio::filesystem::FilesystemBackend;
use slabio::storage::StorageBackendTraits;

fn append_rows() -> Result<(), Box<dyn std::error::Error>> {
    // Create a storage backend writing to a temporary directory
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("append_rows.slab");
    let storage = Arc::new(FilesystemBackend::new());

    // A 4x6 in-memory array
    let mut array_io = ArrayIO::new_for::<f32>(storage.clone(), &[4, 6])?;
    let array: Vec<f32> = (0..24u8).map(f32::from).collect();

    // Append each row of the array to a growable dataset
    for row in 0..4 {
        array_io.set_hyperslab_1d(1, &[row, 0], 1)?;
        array_io.write_array(&array, &path, "rows", true)?;
    }
    let extent = array_io.dataset_extent(&path, "rows")?;
    println!("The dataset extent is {extent:?}");

    // Append every second element of the last row to a second dataset
    array_io.set_hyperslab(&[3, 0], &[4, 2])?;
    array_io.write_array(&array, &path, "odd", true)?;
    println!(
        "The strided dataset extent is {:?}",
        array_io.dataset_extent(&path, "odd")?
    );

    // Read the rows back in reverse order
    array_io.set_hyperslab_1d(1, &[0, 0], 1)?;
    let mut out = vec![0.0f32; 24];
    for row in 0..4 {
        array_io.read_array_row(&mut out, &path, "rows", 3 - row)?;
        println!("Row {} is {:?}", 3 - row, &out[..6]);
    }

    // Write every third column of the array as a fixed-size dataset
    array_io.set_hyperslab(&[0, 0], &[1, 3])?;
    array_io.write_array(&array, &path, "columns", false)?;
    println!(
        "The flat dataset extent is {:?}",
        array_io.dataset_extent(&path, "columns")?
    );

    println!("{} handles are open", storage.open_handles());
    Ok(())
}

fn main() {
    if let Err(err) = append_rows() {
        println!("{err:?}");
    }
}
