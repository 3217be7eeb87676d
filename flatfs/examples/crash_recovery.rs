use flatfs::FlatFs;

pub fn main() {
    let dir = tempfile::tempdir().expect("could not create scratch dir");
    let image = dir.path().join("vdisk.dat");

    // A fresh image is formatted on first mount.
    let mut fs = FlatFs::mount(&image).expect("should mount");
    fs.create("a", b"hello").unwrap();
    fs.create("b", b"world").unwrap();
    println!("before halt: {}", fs.list());
    fs.force_halt().unwrap();

    let fs = FlatFs::mount(&image).expect("should remount");
    match fs.recovery() {
        Some(r) => println!(
            "unclean shutdown repaired (free blocks {} -> {})",
            r.stored_free, r.actual_free
        ),
        None => println!("image was clean"),
    }
    println!("after remount: {} ({:?})", fs.list(), fs.stat());
}
